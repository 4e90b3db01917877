#![cfg(feature = "local-model")]

use candle_core::{DType, Device, Tensor};
use hybridrag_embed::masked_mean_l2;

fn close(a: &[f32], b: &[f32]) -> bool { a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-5) }

#[test]
fn pooled_rows_are_unit_length_and_skip_padding() {
    let dev = Device::Cpu;
    // row 0: both tokens live, mean = [2, 0]; row 1: only token 0 live
    let hidden = Tensor::from_slice(&[1.0f32, 0.0, 3.0, 0.0, 0.0, 3.0, 9.0, 9.0], (2, 2, 2), &dev).unwrap();
    let mask = Tensor::from_slice(&[1u32, 1, 1, 0], (2, 2), &dev).unwrap().to_dtype(DType::F32).unwrap();

    let rows: Vec<Vec<f32>> = masked_mean_l2(&hidden, &mask).unwrap().to_vec2().unwrap();
    assert!(close(&rows[0], &[1.0, 0.0]));
    assert!(close(&rows[1], &[0.0, 1.0]));
}

#[test]
fn rejects_non_3d_hidden_states() {
    let dev = Device::Cpu;
    let hidden = Tensor::zeros((2, 4), DType::F32, &dev).unwrap();
    let mask = Tensor::ones((2, 1), DType::F32, &dev).unwrap();
    assert!(masked_mean_l2(&hidden, &mask).is_err());
}
