//! Integration tests for the commword library
//!
//! These tests verify end-to-end functionality across multiple modules
//! and validate real-world usage scenarios.

use approx::assert_relative_eq;
use commword::api::{kernel_matrix, LinearScorer};
use commword::{
    Alphabet, CommWordKernel, DictionarySnapshot, Kernel, KernelConfig, KernelError,
    LinearOptimization, NormalizationType, WordFeatures, WordHistogram, WordStringFeatures,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};

fn load(lines: &[&str], order: usize) -> Arc<WordStringFeatures> {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    for line in lines {
        writeln!(temp_file, "{line}").expect("Failed to write");
    }
    temp_file.flush().expect("Failed to flush");

    Arc::new(
        WordStringFeatures::from_file(temp_file.path(), Alphabet::Dna, order)
            .expect("Failed to load sequences"),
    )
}

/// Reference dot product over a dense copy of both histograms
fn dense_dot(a: &WordHistogram, b: &WordHistogram, size: usize) -> f64 {
    let mut dense = vec![0.0; size];
    for (word, count) in a.iter() {
        dense[usize::from(word)] = f64::from(count);
    }
    b.iter()
        .map(|(word, count)| dense[usize::from(word)] * f64::from(count))
        .sum()
}

/// Test complete workflow: load sequences -> bind -> kernel matrix
#[test]
fn test_unnormalized_matrix_matches_reference_dot() {
    let lhs = load(&["ACGTACGTTT", "GGGCCCAAAT", "ACACACACAC"], 3);
    let rhs = load(&["ACGTTTACGT", "CACACA", "TTTTTTTT", "GG"], 3);

    let mut kernel = CommWordKernel::new(0, false, NormalizationType::None);
    kernel.init(Arc::clone(&lhs), Arc::clone(&rhs), true).unwrap();

    let matrix = kernel_matrix(&kernel).unwrap();
    for (i, row) in matrix.iter().enumerate() {
        for (j, &value) in row.iter().enumerate() {
            let expected = dense_dot(
                &lhs.histogram(i).unwrap(),
                &rhs.histogram(j).unwrap(),
                lhs.num_symbols(),
            );
            assert_eq!(value, expected, "K({i}, {j})");
        }
    }

    // "GG" is shorter than the k-mer length: empty histogram, zero column
    assert!(matrix.iter().all(|row| row[3] == 0.0));
}

#[test]
fn test_full_normalization_symmetric_binding() {
    let features = load(&["ACGTACGTTT", "GGGCCCAAAT", "ACACACACAC", "TTGACA"], 2);

    let mut kernel = CommWordKernel::new(10, false, NormalizationType::Full);
    kernel
        .init(Arc::clone(&features), Arc::clone(&features), true)
        .unwrap();
    assert!(kernel.has_shared_diagonal());

    for i in 0..features.num_vectors() {
        assert_relative_eq!(kernel.kernel(i, i).unwrap(), 1.0, epsilon = 1e-12);
    }
}

#[test]
fn test_sign_mode_against_count_mode() {
    let features = load(&["AAAAAC", "AAAC"], 1);

    let mut count = CommWordKernel::new(0, false, NormalizationType::None);
    count
        .init(Arc::clone(&features), Arc::clone(&features), true)
        .unwrap();
    let mut sign = CommWordKernel::new(0, true, NormalizationType::None);
    sign.init(Arc::clone(&features), Arc::clone(&features), true)
        .unwrap();

    // A: 5 * 3, C: 1 * 1
    assert_eq!(count.compute(0, 1).unwrap(), 16.0);
    // Shared words A and C
    assert_eq!(sign.compute(0, 1).unwrap(), 2.0);
}

#[test]
fn test_optimized_scoring_workflow() {
    let train = load(
        &[
            "+1 ACGTACGTAC",
            "+1 ACGTTCGTAC",
            "-1 TTTTGGGGCC",
            "-1 TTTGGGGCCC",
        ],
        3,
    );
    let test = load(&["ACGTACGAAC", "TTTTGGGCCC", "ACGTGGGGCC"], 3);

    let labels = train.labels().expect("labeled training set").to_vec();
    let indices: Vec<usize> = (0..labels.len()).collect();

    let mut scorer = LinearScorer::new(KernelConfig::default());
    scorer
        .fit(Arc::clone(&train), Arc::clone(&test), &indices, &labels)
        .unwrap();
    let scores = scorer.score_all().unwrap();

    assert!(scores[0] > 0.0);
    assert!(scores[1] < 0.0);

    let kernel = scorer.kernel();
    for (t, &score) in scores.iter().enumerate() {
        let expected: f64 = indices
            .iter()
            .map(|&i| labels[i] * kernel.compute(i, t).unwrap())
            .sum();
        assert_relative_eq!(score, expected, epsilon = 1e-10);
    }
}

#[test]
fn test_incremental_updates_and_reset() {
    let train = load(&["ACGTACGT", "GGCCGGCC"], 2);
    let test = load(&["ACGTGGCC"], 2);

    let mut kernel = CommWordKernel::new(0, false, NormalizationType::None);
    kernel.init(Arc::clone(&train), Arc::clone(&test), true).unwrap();

    kernel.add_to_normal(0, 1.0).unwrap();
    let first = kernel.compute_optimized(0).unwrap();
    assert_eq!(first, kernel.compute(0, 0).unwrap());

    kernel.add_to_normal(1, -1.0).unwrap();
    let both = kernel.compute_optimized(0).unwrap();
    assert_eq!(both, first - kernel.compute(1, 0).unwrap());

    kernel.clear_normal();
    assert_eq!(kernel.compute_optimized(0).unwrap(), 0.0);

    kernel.delete_optimization();
    assert!(matches!(
        kernel.compute_optimized(0),
        Err(KernelError::Uninitialized(_))
    ));
}

#[test]
fn test_init_data_reuse_across_kernels() {
    let train = load(&["ACGTACGTTT", "GGGCCCAAAT", "ACACACACAC"], 3);
    let test = load(&["ACGTTTACGT", "CACACA"], 3);
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("init.bin");

    let mut original = CommWordKernel::new(0, false, NormalizationType::Sqrt);
    original
        .init(Arc::clone(&train), Arc::clone(&test), true)
        .unwrap();
    original
        .save_init(BufWriter::new(File::create(&path).unwrap()))
        .unwrap();

    let mut restored = CommWordKernel::new(0, false, NormalizationType::Sqrt);
    restored
        .init(Arc::clone(&train), Arc::clone(&test), true)
        .unwrap();
    restored.cleanup();
    assert!(restored.compute(0, 0).is_err());

    restored
        .load_init(BufReader::new(File::open(&path).unwrap()))
        .unwrap();

    assert_eq!(restored.sqrtdiag_lhs(), original.sqrtdiag_lhs());
    assert_eq!(restored.sqrtdiag_rhs(), original.sqrtdiag_rhs());
    assert_eq!(
        kernel_matrix(&restored).unwrap(),
        kernel_matrix(&original).unwrap()
    );
}

#[test]
fn test_dictionary_snapshot_file() {
    let train = load(&["+1 ACGT", "-1 TTTT"], 1);
    let indices = [0, 1];
    let weights = train.labels().unwrap().to_vec();

    let mut kernel = CommWordKernel::new(0, false, NormalizationType::None);
    kernel
        .init(Arc::clone(&train), Arc::clone(&train), true)
        .unwrap();
    kernel.init_optimization(&indices, &weights).unwrap();

    let snapshot = DictionarySnapshot::from_kernel(&kernel).unwrap();
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    snapshot.save_to_file(temp_file.path()).unwrap();

    let loaded = DictionarySnapshot::load_from_file(temp_file.path()).unwrap();
    // A, C, G: +1 each; T: 1 - 4
    assert_eq!(loaded.weights, vec![1.0, 1.0, 1.0, -3.0]);
    assert_eq!(loaded.size, kernel.dictionary_size());
}

#[test]
fn test_length_normalization_uses_word_count() {
    let features = load(&["ACGTACGTAC"], 3);
    assert_eq!(features.vector_len(0).unwrap(), 8);

    let mut raw = CommWordKernel::new(0, false, NormalizationType::None);
    raw.init(Arc::clone(&features), Arc::clone(&features), true)
        .unwrap();
    let mut sqlen = CommWordKernel::new(0, false, NormalizationType::SqLen);
    sqlen
        .init(Arc::clone(&features), Arc::clone(&features), true)
        .unwrap();

    assert_relative_eq!(
        sqlen.compute(0, 0).unwrap(),
        raw.compute(0, 0).unwrap() / 8.0,
        epsilon = 1e-12
    );
}
