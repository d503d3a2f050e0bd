// Property-based tests for the stencil value model and closure capture.
//
// Three categories:
// 1. Packing: pack/unpack and to/from streaming are exact for every element
//    type and shape, and packed bytes equal the unpacked memory layout
// 2. Bounds: every out-of-range index is rejected, never wrapped
// 3. Closure: capture is deterministic and lists each free name once
//
// Uses proptest with explicit configuration to prevent CI flakiness.

use hlsc::closure::{ArgKind, Closure};
use hlsc::ir::{Expr, Stmt, Type};
use hlsc::naming::NamingConventions;
use hlsc::scope::Scope;
use hlsc::stencil_value::{
    from_streaming, pack, to_streaming, unpack, Element, Extents, Stencil, MAX_DIMS,
};
use proptest::prelude::*;

// ── Generators ──────────────────────────────────────────────────────────────

/// 1 to 4 dimensions, each extent a power of two up to 8.
fn arb_dims() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(prop_oneof![Just(1usize), Just(2), Just(4), Just(8)], 1..=MAX_DIMS)
}

fn arb_stencil<T: Element + Arbitrary>() -> impl Strategy<Value = Stencil<T>> {
    arb_dims().prop_flat_map(|dims| {
        let extents = Extents::new(&dims).unwrap();
        prop::collection::vec(any::<T>(), extents.count())
            .prop_map(move |values| Stencil::from_vec(extents, values).unwrap())
    })
}

fn bits_of<T: Element>(s: &Stencil<T>) -> Vec<u64> {
    s.values().iter().map(|v| v.to_bits()).collect()
}

fn check_round_trip<T: Element>(s: &Stencil<T>) -> Result<(), TestCaseError> {
    let packed = pack(s);
    prop_assert_eq!(packed.total_bits(), T::BITS as usize * s.extents().count());

    // Element-wise bit patterns, so NaN payloads are compared exactly.
    let back = unpack(&packed);
    prop_assert_eq!(back.extents(), s.extents());
    prop_assert_eq!(bits_of(&back), bits_of(s));
    prop_assert_eq!(&pack(&back), &packed);

    let through_stream = from_streaming(to_streaming(packed.clone()));
    prop_assert_eq!(&through_stream, &packed);
    Ok(())
}

fn little_endian_layout<T: Element>(s: &Stencil<T>) -> Vec<u8> {
    let bytes = (T::BITS / 8) as usize;
    s.values()
        .iter()
        .flat_map(|v| v.to_bits().to_le_bytes().into_iter().take(bytes))
        .collect()
}

// ── Packing ─────────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn round_trip_u8(s in arb_stencil::<u8>()) {
        check_round_trip(&s)?;
    }

    #[test]
    fn round_trip_u16(s in arb_stencil::<u16>()) {
        check_round_trip(&s)?;
    }

    #[test]
    fn round_trip_i32(s in arb_stencil::<i32>()) {
        check_round_trip(&s)?;
    }

    #[test]
    fn round_trip_f32(s in arb_stencil::<f32>()) {
        check_round_trip(&s)?;
    }

    #[test]
    fn round_trip_f64(s in arb_stencil::<f64>()) {
        check_round_trip(&s)?;
    }

    #[test]
    fn packed_bytes_match_memory_layout(s in arb_stencil::<i16>()) {
        prop_assert_eq!(pack(&s).to_le_bytes(), little_endian_layout(&s));
    }

    #[test]
    fn packed_get_matches_unpacked_get(s in arb_stencil::<u16>()) {
        let packed = pack(&s);
        for idx in s.extents().indices() {
            prop_assert_eq!(packed.get(idx).unwrap(), s.get(idx).unwrap());
        }
    }
}

// ── Bounds ──────────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn out_of_range_index_is_rejected(
        dims in arb_dims(),
        dim in 0..MAX_DIMS,
        over in 0usize..4,
    ) {
        let extents = Extents::new(&dims).unwrap();
        let mut idx = [0; MAX_DIMS];
        idx[dim] = extents.dims()[dim] + over;
        let mut s = Stencil::filled(extents, 0u8);
        let mut p = pack(&s);
        prop_assert!(s.get(idx).is_err());
        prop_assert!(s.set(idx, 1).is_err());
        prop_assert!(p.get(idx).is_err());
        prop_assert!(p.set(idx, 1).is_err());
        // Nothing was written by the failed stores.
        prop_assert!(s.values().iter().all(|&v| v == 0));
        prop_assert!(unpack(&p).values().iter().all(|&v| v == 0));
    }
}

// ── Closure ─────────────────────────────────────────────────────────────────

fn scalar(name: &str) -> Expr {
    Expr::var(name, Type::int(32))
}

/// A region body touching buffers `a` (read) and `b` (written) and the
/// scalars named in `scalars`, under a loop over `x`.
fn region_body(scalars: &[String]) -> Stmt {
    let mut value = Expr::load("a", Type::uint(8), scalar("x"));
    for s in scalars {
        value = Expr::add(value, scalar(s));
    }
    Stmt::for_loop(
        "x",
        Expr::int(0),
        Expr::int(16),
        Stmt::block(vec![
            Stmt::store("b", value.clone(), scalar("x")),
            Stmt::evaluate(Expr::call("probe", Type::int(32), vec![value])),
        ]),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn capture_is_deterministic_and_complete(
        scalars in prop::collection::btree_set("p[0-9]", 0..=3),
    ) {
        let scalars: Vec<String> = scalars.into_iter().collect();
        let body = region_body(&scalars);
        let naming = NamingConventions::default();
        let stencils = Scope::root();

        let first = Closure::capture(&body).arguments(&stencils, &naming, "hw").unwrap();
        let second = Closure::capture(&body).arguments(&stencils, &naming, "hw").unwrap();
        prop_assert_eq!(&first, &second);

        let names: Vec<&str> = first.iter().map(|a| a.name.as_str()).collect();
        let mut expected = vec!["a", "b"];
        expected.extend(scalars.iter().map(String::as_str));
        prop_assert_eq!(names, expected);

        prop_assert_eq!(first[0].kind, ArgKind::MemoryBuffer);
        prop_assert!(first[0].read && !first[0].write);
        prop_assert!(!first[1].read && first[1].write);
        prop_assert!(first[2..].iter().all(|a| a.kind == ArgKind::Scalar));
    }
}
