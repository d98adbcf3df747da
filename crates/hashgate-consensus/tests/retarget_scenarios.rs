use hashgate_consensus::{
    bits_to_target, clamp_interval_timespan, clamp_per_block_timespan, encode_compact,
    next_required_bits, ConsensusParams,
};
use hashgate_core::{ChainIndex, ChainView, Hash32};
use num_bigint::BigUint;

const T0: i64 = 1_700_000_000;

fn hash(height: u64) -> Hash32 {
    Hash32(*blake3::hash(&height.to_le_bytes()).as_bytes())
}

/// Contiguous chain covering `heights`, block times taken from `time_at`.
fn chain_over(
    heights: std::ops::RangeInclusive<u64>,
    bits: u32,
    time_at: impl Fn(u64) -> i64,
) -> ChainIndex {
    let mut chain = ChainIndex::with_base_height(*heights.start());
    for h in heights {
        chain.append(hash(h), time_at(h), bits).expect("append");
    }
    chain
}

fn exact_limit_params() -> ConsensusParams {
    ConsensusParams {
        pow_limit: bits_to_target(0x1e0f_ffff).expect("limit"),
        ..ConsensusParams::mainnet()
    }
}

#[test]
fn on_schedule_window_keeps_limit_difficulty() {
    let params = exact_limit_params();
    let interval = params.difficulty_adjustment_interval();
    assert_eq!(interval, 8064);

    let last_height = interval * 2 - 1;
    let first_height = last_height - interval;
    let chain = chain_over(first_height..=last_height, params.pow_limit_bits(), |h| {
        T0 + (h - first_height) as i64 * params.pow_target_spacing
    });
    let last = chain.tip().expect("tip");
    let first = chain.entry(first_height).expect("first");
    assert_eq!(last.timestamp - first.timestamp, params.pow_target_timespan);

    let bits = next_required_bits(&chain, last, last.timestamp + 150, &params).expect("bits");
    assert_eq!(bits, last.bits);
}

#[test]
fn per_block_fast_block_raises_difficulty_by_ninth() {
    let mut params = ConsensusParams::mainnet();
    params.per_block_difficulty_activation_height = 100;
    let old_bits = 0x1c0a_bcde;

    let chain = chain_over(100..=120, old_bits, |h| T0 + (h - 100) as i64 * 100);
    let last = chain.tip().expect("tip");
    assert_eq!(clamp_per_block_timespan(100, &params), 135);

    let bits = next_required_bits(&chain, last, last.timestamp + 100, &params).expect("bits");
    let old = bits_to_target(old_bits).expect("old");
    assert_eq!(bits, encode_compact(&(&old * 135u32 / 150u32)));
    assert!(bits_to_target(bits).expect("new") < old);
}

#[test]
fn stalled_testnet_block_gets_easiest_target() {
    let params = ConsensusParams {
        per_block_difficulty_activation_height: u64::MAX,
        ..ConsensusParams::testnet()
    };
    let interval = params.difficulty_adjustment_interval();

    for bits in [0x1b04_864c, 0x1c0a_bcde, 0x1d00_ffff] {
        let chain = chain_over(interval..=interval + 5, bits, |h| T0 + h as i64 * 150);
        let last = chain.tip().expect("tip");
        assert_ne!((last.height + 1) % interval, 0);

        let required = next_required_bits(&chain, last, last.timestamp + 301, &params)
            .expect("bits");
        assert_eq!(required, params.pow_limit_bits());
    }
}

#[test]
fn legacy_non_boundary_heights_pass_bits_through() {
    let params = ConsensusParams::mainnet();
    let interval = params.difficulty_adjustment_interval();
    let chain = chain_over(interval..=interval * 2 - 2, 0x1c0a_bcde, |h| T0 + h as i64 * 7);

    let mut cur = chain.tip();
    while let Some(entry) = cur {
        let bits = next_required_bits(&chain, entry, entry.timestamp + 10_000, &params)
            .expect("bits");
        assert_eq!(bits, entry.bits, "height {}", entry.height);
        cur = chain.previous(entry);
    }
}

#[test]
fn per_block_activation_edge_keeps_bits() {
    let mut params = ConsensusParams::mainnet();
    params.per_block_difficulty_activation_height = 5_000;
    let chain = chain_over(4_990..=4_999, 0x1c0a_bcde, |h| T0 + h as i64);
    let last = chain.tip().expect("tip");
    assert_eq!(last.height, params.per_block_difficulty_activation_height - 1);

    let bits = next_required_bits(&chain, last, last.timestamp + 1, &params).expect("bits");
    assert_eq!(bits, last.bits);
}

#[test]
fn per_block_ratio_stays_inside_band() {
    let mut params = ConsensusParams::mainnet();
    params.per_block_difficulty_activation_height = 1;
    let old_bits = 0x1c0a_bcde;
    let old = bits_to_target(old_bits).expect("old");

    for gap in [-600i64, -1, 0, 1, 60, 134, 135, 150, 179, 180, 181, 900, 86_400] {
        assert!((135..=180).contains(&clamp_per_block_timespan(gap, &params)));

        let mut chain = ChainIndex::with_base_height(10);
        chain.append(hash(10), T0, old_bits).expect("prev");
        chain.append(hash(11), T0 + gap, old_bits).expect("last");
        let last = chain.tip().expect("tip");

        let bits = next_required_bits(&chain, last, last.timestamp + 1, &params).expect("bits");
        let new = bits_to_target(bits).expect("new");
        // Compact encoding only ever rounds the target down.
        assert!(&new * 150u32 <= &old * 180u32, "gap {gap}");
        assert!(&new * 150u32 * 10_001u32 >= &old * 135u32 * 10_000u32, "gap {gap}");
    }
}

#[test]
fn interval_bands_follow_activation() {
    let params = ConsensusParams::mainnet();
    let span = params.pow_target_timespan;
    let before = params.difficulty_change_activation_height - 1;
    let after = params.difficulty_change_activation_height;

    for actual in [i64::MIN, -1, 0, span / 5, span, span * 5, span * 7, i64::MAX] {
        let pre = clamp_interval_timespan(actual, before, &params);
        assert!(pre >= span / 4 && pre <= span * 4, "pre {actual}");
        let post = clamp_interval_timespan(actual, after, &params);
        assert!(post >= span * 2 / 3 && post <= span * 6, "post {actual}");
    }
}

#[test]
fn post_activation_retarget_relaxes_up_to_six_times() {
    let params = ConsensusParams {
        difficulty_change_activation_height: 0,
        ..ConsensusParams::mainnet()
    };
    let interval = params.difficulty_adjustment_interval();
    let old_bits = 0x1b04_864c;

    // Window ten times slower than scheduled: clamped to six timespans.
    let first_height = interval * 3 - 1;
    let last_height = first_height + interval;
    let chain = chain_over(first_height..=last_height, old_bits, |h| {
        T0 + (h - first_height) as i64 * params.pow_target_spacing * 10
    });
    let last = chain.tip().expect("tip");
    let bits = next_required_bits(&chain, last, last.timestamp + 1, &params).expect("bits");

    let old = bits_to_target(old_bits).expect("old");
    assert_eq!(bits, encode_compact(&(&old * 6u32)));
    let new: BigUint = bits_to_target(bits).expect("new");
    assert!(new <= params.pow_limit);
}

#[test]
fn slow_window_at_mainnet_limit_wraps_to_harder_target() {
    let params = ConsensusParams::mainnet();
    let interval = params.difficulty_adjustment_interval();
    let limit_bits = params.pow_limit_bits();

    // Four times slower than scheduled, before the band change.
    let last_height = interval * 2 - 1;
    let first_height = last_height - interval;
    let chain = chain_over(first_height..=last_height, limit_bits, |h| {
        T0 + (h - first_height) as i64 * params.pow_target_spacing * 4
    });
    let last = chain.tip().expect("tip");
    assert!(last.height < params.difficulty_change_activation_height);
    assert_eq!(
        clamp_interval_timespan(last.timestamp - T0, last.height, &params),
        params.pow_target_timespan * 4
    );

    // The 235-bit target times 4,838,400 needs 258 bits and wraps.
    let bits = next_required_bits(&chain, last, last.timestamp + 1, &params).expect("bits");
    assert_eq!(bits, 0x1e08_850c);
    let old = bits_to_target(limit_bits).expect("old");
    assert!(bits_to_target(bits).expect("new") < old);
}
