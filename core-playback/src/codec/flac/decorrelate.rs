//! Stereo decorrelation reconstruction: left/side, right/side, mid/side.

/// `channel0` is the decoded left subframe, `channel1` the decoded side
/// subframe (`left - right`). Returns `(left, right)`.
pub fn reconstruct_left_side(left: &[i64], side: &[i64]) -> (Vec<i64>, Vec<i64>) {
    let right: Vec<i64> = left.iter().zip(side).map(|(&l, &s)| l - s).collect();
    (left.to_vec(), right)
}

/// `channel0` is the decoded side subframe (`left - right`), `channel1`
/// the decoded right subframe. Returns `(left, right)`.
pub fn reconstruct_right_side(right: &[i64], side: &[i64]) -> (Vec<i64>, Vec<i64>) {
    let left: Vec<i64> = right.iter().zip(side).map(|(&r, &s)| r + s).collect();
    (left, right.to_vec())
}

/// `channel0` is the decoded mid subframe, `channel1` the decoded side
/// subframe. FLAC's mid/side encoding folds the one bit of precision lost
/// by averaging `(left + right) >> 1` back in via the side channel's LSB.
pub fn reconstruct_mid_side(mid: &[i64], side: &[i64]) -> (Vec<i64>, Vec<i64>) {
    let mut left = Vec::with_capacity(mid.len());
    let mut right = Vec::with_capacity(mid.len());
    for (&m, &s) in mid.iter().zip(side) {
        let mid_shifted = (m << 1) | (s & 1);
        left.push((mid_shifted + s) >> 1);
        right.push((mid_shifted - s) >> 1);
    }
    (left, right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_side_recovers_right() {
        let left = vec![100, 200, 300];
        let side = vec![10, 20, 30]; // left - right
        let (l, r) = reconstruct_left_side(&left, &side);
        assert_eq!(l, left);
        assert_eq!(r, vec![90, 180, 270]);
    }

    #[test]
    fn right_side_recovers_left() {
        let right = vec![90, 180, 270];
        let side = vec![10, 20, 30];
        let (l, r) = reconstruct_right_side(&right, &side);
        assert_eq!(l, vec![100, 200, 300]);
        assert_eq!(r, right);
    }

    #[test]
    fn mid_side_round_trips_known_pair() {
        let left = 100i64;
        let right = 96i64;
        let side = left - right;
        let mid = (left + right) >> 1;
        let (l, r) = reconstruct_mid_side(&[mid], &[side]);
        assert_eq!(l[0], left);
        assert_eq!(r[0], right);
    }

    #[test]
    fn mid_side_preserves_odd_sum_lsb() {
        let left = 101i64;
        let right = 96i64;
        let side = left - right; // 5
        let mid = (left + right) >> 1; // 98
        let (l, r) = reconstruct_mid_side(&[mid], &[side]);
        assert_eq!(l[0], left);
        assert_eq!(r[0], right);
    }
}
