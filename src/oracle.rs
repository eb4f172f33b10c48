use crate::element::Element;
use crate::error::{Error, Mismatch};
use crate::workload::Workload;
use crate::xor::{Kind, Xor};

/// Plain element-by-element XOR, independent of every strategy.
pub fn reference<T: Element>(old: &[T], new: &[T]) -> Vec<T> {
    old.iter().zip(new.iter()).map(|(&o, &n)| o ^ n).collect()
}

/// Compares `actual` against the reference and reports the first position
/// where they differ. There is no tolerance.
pub fn verify<T: Element>(kind: Kind, old: &[T], new: &[T], actual: &[T]) -> Result<(), Error> {
    if old.len() != new.len() || new.len() != actual.len() {
        return Err(Error::LengthMismatch { old: old.len(), new: new.len(), difference: actual.len() });
    }
    for position in 0..actual.len() {
        let expected = old[position] ^ new[position];
        if actual[position] != expected {
            return Err(Error::Mismatch(Mismatch {
                kind,
                width: T::WIDTH,
                position,
                actual: actual[position].to_u64(),
                expected: expected.to_u64(),
            }));
        }
    }
    Ok(())
}

/// Runs `strategy` over `workload` and checks the destination.
pub fn check<T: Element>(strategy: &dyn Xor, workload: &mut Workload<T>) -> Result<(), Error> {
    workload.run(strategy)?;
    verify(strategy.kind(), &workload.old[..], &workload.new[..], &workload.difference[..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capabilities;
    use crate::element::ElementWidth;
    use crate::portable::{Portable, SUPPORTED_WIDTHS};
    use crate::registry::Registry;
    use crate::workload::{self, FRAME_BYTES, FRAME_WORDS};
    use crate::xor::Scalar;

    /// `None` when the host cannot run `kind`.
    fn check_kind<T: Element>(registry: &Registry, kind: Kind, workload: &Workload<T>) -> Option<Result<(), Error>> {
        let strategy = registry.get(kind)?;
        let mut workload = workload.clone();
        Some(check(strategy, &mut workload))
    }

    fn run_test<T: Element>(kind: Kind, workload: Result<Workload<T>, Error>) {
        let registry = Registry::detect();
        if let Some(Err(e)) = check_kind(&registry, kind, &workload.unwrap()) {
            panic!("{}", e);
        }
    }

    macro_rules! strategy_tests {
        ($($kind:ident: $bytes:ident, $words:ident;)*) => {
            $(
                #[test]
                fn $bytes() {
                    run_test(Kind::$kind, workload::frame_bytes());
                }

                #[test]
                fn $words() {
                    run_test(Kind::$kind, workload::frame_words());
                }
            )*
        };
    }

    strategy_tests! {
        Scalar: scalar_bytes, scalar_words;
        BytePointers: byte_pointers_bytes, byte_pointers_words;
        LongPointers: long_pointers_bytes, long_pointers_words;
        Avx: avx_bytes, avx_words;
        Avx2: avx2_bytes, avx2_words;
        Portable: portable_bytes, portable_words;
    }

    #[test]
    fn portable_widths() {
        let bytes = workload::frame_bytes().unwrap();
        let words = workload::frame_words().unwrap();
        for width in SUPPORTED_WIDTHS {
            let portable = Portable::with_width(width).unwrap();
            check(&portable, &mut bytes.clone()).unwrap();
            check(&portable, &mut words.clone()).unwrap();
        }
    }

    #[test]
    fn unavailable_kind_is_skipped() {
        let registry = Registry::from_capabilities(Capabilities::default());
        let workload = Workload::<u8>::filled(64, 1, 2).unwrap();
        assert_eq!(check_kind(&registry, Kind::Avx2, &workload), None);
        assert_eq!(check_kind(&registry, Kind::Portable, &workload), None);
        assert_eq!(check_kind(&registry, Kind::Scalar, &workload), Some(Ok(())));
    }

    #[test]
    fn alternating_bytes_give_all_ones() {
        let registry = Registry::detect();
        for strategy in registry.iter() {
            let mut workload = Workload::<u8>::filled(FRAME_BYTES, 0xAA, 0x55).unwrap();
            workload.run(strategy).unwrap();
            assert!(workload.difference.iter().all(|&b| b == 0xFF), "{}", strategy.kind());
        }
    }

    #[test]
    fn zero_and_ones_words() {
        let registry = Registry::detect();
        for strategy in registry.iter() {
            let mut workload = Workload::<u64>::filled(FRAME_WORDS, 0, !0).unwrap();
            workload.run(strategy).unwrap();
            assert!(workload.difference.iter().all(|&w| w == 0xFFFFFFFFFFFFFFFF), "{}", strategy.kind());
        }
    }

    #[test]
    fn reports_first_mismatch() {
        let old = [0x00u8, 0x11, 0x22, 0x33];
        let new = [0xFFu8, 0xFF, 0xFF, 0xFF];
        let actual = [0xFFu8, 0xEE, 0x0D, 0x00];
        assert_eq!(verify(Kind::Avx, &old, &new, &actual),
                   Err(Error::Mismatch(Mismatch {
                       kind: Kind::Avx,
                       width: ElementWidth::Byte,
                       position: 2,
                       actual: 0x0D,
                       expected: 0xDD,
                   })));
        let e = verify(Kind::Avx, &old, &new, &actual).unwrap_err();
        assert_eq!(e.to_string(), "avx: invalid byte at position 2: 0x0d != 0xdd.");
    }

    #[test]
    fn detects_untouched_destination() {
        let mut workload = Workload::<u64>::filled(8, 1, 2).unwrap();
        let e = verify(Kind::Scalar, &workload.old[..], &workload.new[..], &workload.difference[..]).unwrap_err();
        assert_eq!(e.to_string(), "scalar: invalid word at position 0: 0x0000000000000000 != 0x0000000000000003.");
        check(&Scalar::new(), &mut workload).unwrap();
    }

    #[test]
    fn reference_matches_scalar() {
        let old: Vec<u8> = (0..64).collect();
        let new: Vec<u8> = (0..64).map(|i| i * 3).collect();
        let mut difference = vec![0u8; 64];
        Scalar::new().xor_bytes(&old[..], &new[..], &mut difference[..]).unwrap();
        assert_eq!(reference(&old[..], &new[..]), difference);
    }

    quickcheck::quickcheck! {
        fn strategies_match_reference(old: Vec<u8>, new: Vec<u8>) -> bool {
            let len = std::cmp::min(old.len(), new.len()) / 32 * 32;
            let (old, new) = (&old[..len], &new[..len]);
            let expected = reference(old, new);
            Registry::detect().iter().all(|strategy| {
                let mut difference = vec![0u8; len];
                strategy.xor_bytes(old, new, &mut difference[..]).is_ok() && difference == expected
            })
        }

        fn xor_is_self_inverse(a: Vec<u64>, b: Vec<u64>) -> bool {
            let len = std::cmp::min(a.len(), b.len()) / 4 * 4;
            let (a, b) = (&a[..len], &b[..len]);
            Registry::detect().iter().all(|strategy| {
                let mut once = vec![0u64; len];
                let mut twice = vec![0u64; len];
                strategy.xor_words(a, b, &mut once[..]).is_ok()
                    && strategy.xor_words(&once[..], b, &mut twice[..]).is_ok()
                    && twice == a
            })
        }

        fn xor_with_self_is_zero(a: Vec<u8>) -> bool {
            let len = a.len() / 32 * 32;
            let a = &a[..len];
            Registry::detect().iter().all(|strategy| {
                let mut difference = vec![0xA5u8; len];
                strategy.xor_bytes(a, a, &mut difference[..]).is_ok() && difference.iter().all(|&b| b == 0)
            })
        }
    }
}
