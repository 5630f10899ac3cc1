use tracing::debug;

use crate::peaks::Peak;

// 64-bit landmark layout, high to low:
// anchor freq (12) | target freq (12) | delta time (14) | reserved (26) = 0.
const FREQ_BITS: u32 = 12;
const DELTA_BITS: u32 = 14;
const RESERVED_BITS: u32 = 26;

const F2_SHIFT: u32 = DELTA_BITS + RESERVED_BITS;
const F1_SHIFT: u32 = FREQ_BITS + F2_SHIFT;

/// One landmark record: a packed anchor/target pair hash together with the
/// time bin of the anchor peak. The same shape serves ingest (tagged with a
/// track id at insertion) and query (looked up as-is).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Landmark {
    pub hash: u64,
    pub anchor_time: u32,
}

/// Pack an anchor/target pair into the landmark hash.
///
/// The encoding is a pure function of the triple, identical on the ingest and
/// query paths; integer peak bins make it immune to floating-point drift.
pub fn pack_hash(f1: u16, f2: u16, delta_t: u32) -> u64 {
    let f1 = u64::from(f1) & ((1 << FREQ_BITS) - 1);
    let f2 = u64::from(f2) & ((1 << FREQ_BITS) - 1);
    let dt = u64::from(delta_t) & ((1 << DELTA_BITS) - 1);
    (f1 << F1_SHIFT) | (f2 << F2_SHIFT) | (dt << RESERVED_BITS)
}

/// Pair every peak with the peaks in its target zone and emit one landmark
/// per pair.
///
/// The peak list must be time-ordered. For an anchor `P[i]`, the target zone
/// holds at most the next `target_zone` peaks, and only those within
/// `target_zone` time bins of the anchor; the looser of the two bounds
/// terminates the scan. One anchor therefore yields at most `target_zone`
/// records, and `|landmarks| <= |peaks| * target_zone` overall. Duplicate
/// `(hash, anchor_time)` records are possible and left to the consumer.
pub fn landmarks(peaks: &[Peak], target_zone: u32) -> Vec<Landmark> {
    let mut records = Vec::new();

    for (i, anchor) in peaks.iter().enumerate() {
        let fan_out_end = peaks.len().min(i + 1 + target_zone as usize);
        for target in &peaks[i + 1..fan_out_end] {
            let delta_t = target.time_bin - anchor.time_bin;
            if delta_t > target_zone {
                // Peaks are time-sorted, so every later target is out of the
                // zone as well.
                break;
            }
            records.push(Landmark {
                hash: pack_hash(anchor.freq_bin, target.freq_bin, delta_t),
                anchor_time: anchor.time_bin,
            });
        }
    }

    debug!(
        peaks = peaks.len(),
        landmarks = records.len(),
        target_zone,
        "generated landmarks"
    );
    records
}
