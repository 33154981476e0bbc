//! Fixed (orders 0-4) and LPC sample predictors, in 64-bit arithmetic to
//! avoid overflow across the whole decode chain regardless of bit depth.

use crate::error::{PlaybackError, Result};

/// Reconstructs a full subframe from `warmup` (the first `order` raw
/// samples) and `residual` (one value per remaining sample) using the
/// fixed-predictor formula for `order` (0-4).
pub fn reconstruct_fixed(order: u32, warmup: &[i64], residual: &[i64]) -> Result<Vec<i64>> {
    if warmup.len() != order as usize {
        return Err(PlaybackError::Format("fixed predictor warmup length mismatch".into()));
    }
    let mut out = Vec::with_capacity(warmup.len() + residual.len());
    out.extend_from_slice(warmup);
    for (i, &r) in residual.iter().enumerate() {
        let n = out.len();
        let predicted = match order {
            0 => 0,
            1 => out[n - 1],
            2 => 2 * out[n - 1] - out[n - 2],
            3 => 3 * out[n - 1] - 3 * out[n - 2] + out[n - 3],
            4 => 4 * out[n - 1] - 6 * out[n - 2] + 4 * out[n - 3] - out[n - 4],
            _ => return Err(PlaybackError::Format(format!("invalid fixed predictor order {order}"))),
        };
        let _ = i;
        out.push(predicted + r);
    }
    Ok(out)
}

/// Reconstructs a full subframe using a quantized LPC predictor:
/// `prediction = (sum(coef[j] * history[i-1-j]) ) >> shift`, all in i64.
pub fn reconstruct_lpc(coeffs: &[i32], shift: u32, warmup: &[i64], residual: &[i64]) -> Result<Vec<i64>> {
    if warmup.len() != coeffs.len() {
        return Err(PlaybackError::Format("LPC warmup length mismatch".into()));
    }
    let order = coeffs.len();
    let mut out = Vec::with_capacity(warmup.len() + residual.len());
    out.extend_from_slice(warmup);
    for &r in residual {
        let n = out.len();
        let mut prediction: i64 = 0;
        for (j, &coef) in coeffs.iter().enumerate() {
            prediction += coef as i64 * out[n - 1 - j];
        }
        let _ = order;
        out.push((prediction >> shift) + r);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_order_0_is_residual_only() {
        let out = reconstruct_fixed(0, &[], &[1, 2, 3]).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn fixed_order_1_accumulates() {
        let out = reconstruct_fixed(1, &[10], &[1, 1, 1]).unwrap();
        assert_eq!(out, vec![10, 11, 12, 13]);
    }

    #[test]
    fn fixed_order_2_matches_formula() {
        // Constant ramp: samples 0,1,2,3,4 has zero second-order residual.
        let out = reconstruct_fixed(2, &[0, 1], &[0, 0, 0]).unwrap();
        assert_eq!(out, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn lpc_reconstructs_simple_predictor() {
        // coef=[2], shift=1 => prediction = history[-1]*2>>1 = history[-1]
        let out = reconstruct_lpc(&[2], 1, &[5], &[0, 0, 0]).unwrap();
        assert_eq!(out, vec![5, 5, 5, 5]);
    }

    #[test]
    fn rejects_mismatched_warmup_length() {
        assert!(reconstruct_fixed(2, &[1], &[0]).is_err());
        assert!(reconstruct_lpc(&[1, 2], 0, &[1], &[0]).is_err());
    }
}
