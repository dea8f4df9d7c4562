use interop_js::Long64;
use proptest::prelude::*;

fn arb_long() -> impl Strategy<Value = Long64> {
  prop_oneof![
    any::<i64>().prop_map(Long64::from_i64),
    (any::<i32>(), any::<i32>()).prop_map(|(low, high)| Long64::from_two_int(low, high)),
    Just(Long64::MIN_VALUE),
    Just(Long64::MAX_VALUE),
    Just(Long64::NEG_ONE),
  ]
}

proptest! {
  #[test]
  fn word_pair_round_trips(low in any::<i32>(), high in any::<i32>()) {
    let value = Long64::from_two_int(low, high);
    prop_assert_eq!(value.low_bits(), low);
    prop_assert_eq!(value.high_bits(), high);
  }

  #[test]
  fn add_commutes_and_wraps(a in arb_long(), b in arb_long()) {
    prop_assert_eq!(a.add(b), b.add(a));
    prop_assert_eq!(a.add(b).to_i64(), a.to_i64().wrapping_add(b.to_i64()));
  }

  #[test]
  fn ring_operations_match_native(a in any::<i64>(), b in any::<i64>()) {
    let (x, y) = (Long64::from_i64(a), Long64::from_i64(b));
    prop_assert_eq!(x.sub(y).to_i64(), a.wrapping_sub(b));
    prop_assert_eq!(x.mul(y).to_i64(), a.wrapping_mul(b));
    prop_assert_eq!(x.and(y).to_i64(), a & b);
    prop_assert_eq!(x.or(y).to_i64(), a | b);
    prop_assert_eq!(x.xor(y).to_i64(), a ^ b);
    prop_assert_eq!(x.not().to_i64(), !a);
    prop_assert_eq!(x.compare(y), a.cmp(&b));
    prop_assert_eq!(x.compare_unsigned(y), (a as u64).cmp(&(b as u64)));
  }

  #[test]
  fn division_matches_native(a in any::<i64>(), b in any::<i64>().prop_filter("non-zero", |b| *b != 0)) {
    let (x, y) = (Long64::from_i64(a), Long64::from_i64(b));
    prop_assert_eq!(x.div(y).to_i64(), a.wrapping_div(b));
    prop_assert_eq!(x.rem(y).to_i64(), a.wrapping_rem(b));
  }

  #[test]
  fn shifts_match_native(a in any::<i64>(), amount in any::<i32>()) {
    let x = Long64::from_i64(a);
    let n = (amount & 63) as u32;
    prop_assert_eq!(x.shl(amount).to_i64(), a.wrapping_shl(n));
    prop_assert_eq!(x.shr(amount).to_i64(), a.wrapping_shr(n));
    prop_assert_eq!(x.ushr(amount).to_i64(), ((a as u64) >> n) as i64);
  }

  #[test]
  fn from_double_truncates_like_as_cast(value in any::<f64>()) {
    prop_assert_eq!(Long64::from_double(value).to_i64(), value as i64);
  }

  #[test]
  fn decimal_text_round_trips(a in any::<i64>()) {
    let x = Long64::from_i64(a);
    prop_assert_eq!(x.to_string(), a.to_string());
    prop_assert_eq!(Long64::parse(&a.to_string()), Some(x));
  }

  #[test]
  fn bigint_round_trips(a in any::<i64>()) {
    let x = Long64::from_i64(a);
    prop_assert_eq!(Long64::from_bigint(&x.to_bigint()), x);
  }
}
