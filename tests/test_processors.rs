//! Integration tests for the processor chain: offset bookkeeping across
//! mixed transforms, registry-driven construction, and fitted-state
//! round trips.

use approx::assert_relative_eq;
use ndarray::{array, concatenate, s, Array2, Axis};
use tabprep::{
    ChainOffsets, IdenticalProcessor, PrepError, Processor, ProcessorConfig, ProcessorRegistry,
};

/// Fit a chain column by column and return (chain, processed matrix).
fn fit_chain(
    registry: &ProcessorRegistry,
    methods: &[&str],
    converted: &Array2<f64>,
    config: &ProcessorConfig,
) -> (Vec<Box<dyn Processor>>, Array2<f64>) {
    let mut chain: Vec<Box<dyn Processor>> = Vec::new();
    let mut blocks: Vec<Array2<f64>> = Vec::new();
    for method in methods {
        let mut processor = registry.make(method, &chain, config).unwrap();
        let input = converted.slice(s![.., processor.input_indices()]).to_owned();
        processor.fit(input.view()).unwrap();
        blocks.push(processor.process(&input).unwrap());
        chain.push(processor);
    }
    let views: Vec<_> = blocks.iter().map(|b| b.view()).collect();
    (chain, concatenate(Axis(1), &views).unwrap())
}

#[test]
fn test_chain_offsets_with_expanding_transform() {
    let registry = ProcessorRegistry::default();
    let config = ProcessorConfig::default();
    let converted = array![
        [1.0, 0.0, 10.0],
        [2.0, 1.0, 20.0],
        [3.0, 2.0, 30.0],
        [4.0, 0.0, 40.0],
    ];
    let (chain, processed) =
        fit_chain(&registry, &["normalize", "one_hot", "normalize"], &converted, &config);

    // Input blocks stay unit width; the one-hot expands 1 -> 3
    assert_eq!(chain[0].output_indices(), 0..1);
    assert_eq!(chain[1].input_indices(), 1..2);
    assert_eq!(chain[1].output_indices(), 1..4);
    assert_eq!(chain[2].input_indices(), 2..3);
    assert_eq!(chain[2].output_indices(), 4..5);
    assert_eq!(processed.ncols(), 5);

    // Every processor's output block sits exactly at its output indices
    for processor in &chain {
        let input = converted.slice(s![.., processor.input_indices()]).to_owned();
        let expected = processor.process(&input).unwrap();
        let actual = processed.slice(s![.., processor.output_indices()]).to_owned();
        assert_eq!(actual, expected);
    }
}

#[test]
fn test_offsets_sum_invariant() {
    let registry = ProcessorRegistry::default();
    let config = ProcessorConfig::default();
    let converted = array![[1.0, 0.0], [2.0, 1.0], [3.0, 2.0]];
    let (chain, _) = fit_chain(&registry, &["identical", "one_hot"], &converted, &config);

    for (i, processor) in chain.iter().enumerate() {
        let offsets = processor.offsets();
        let input_sum: usize = chain[..i].iter().map(|p| p.input_dim()).sum();
        let output_sum: usize = chain[..i].iter().map(|p| p.output_dim()).sum();
        assert_eq!(offsets.input_start, input_sum);
        assert_eq!(offsets.output_start, output_sum);
    }
}

#[test]
fn test_normalize_round_trip() {
    let registry = ProcessorRegistry::default();
    let mut processor = registry
        .make("normalize", &[], &ProcessorConfig::default())
        .unwrap();
    let block = array![[10.0], [20.0], [30.0], [40.0]];
    processor.fit(block.view()).unwrap();

    let processed = processor.process(&block).unwrap();
    let mean: f64 = processed.iter().sum::<f64>() / processed.len() as f64;
    assert_relative_eq!(mean, 0.0, epsilon = 1e-12);

    let recovered = processor.recover(&processed).unwrap();
    for (a, b) in recovered.iter().zip(block.iter()) {
        assert_relative_eq!(a, b, epsilon = 1e-9);
    }
}

#[test]
fn test_dump_rebuild_preserves_chain_behavior() {
    let registry = ProcessorRegistry::default();
    let config = ProcessorConfig::default();
    let converted = array![[1.0, 0.0], [2.0, 1.0], [3.0, 0.0], [4.0, 2.0]];
    let (chain, processed) = fit_chain(&registry, &["normalize", "one_hot"], &converted, &config);

    let mut rebuilt: Vec<Box<dyn Processor>> = Vec::new();
    for processor in &chain {
        let dump = processor.dump().unwrap();
        let restored = registry.rebuild(&dump, &rebuilt, &config).unwrap();
        assert!(restored.is_fitted());
        rebuilt.push(restored);
    }

    let blocks: Vec<Array2<f64>> = rebuilt
        .iter()
        .map(|p| {
            let input = converted.slice(s![.., p.input_indices()]).to_owned();
            p.process(&input).unwrap()
        })
        .collect();
    let views: Vec<_> = blocks.iter().map(|b| b.view()).collect();
    assert_eq!(concatenate(Axis(1), &views).unwrap(), processed);
}

#[test]
fn test_custom_processor_registration() {
    fn make_passthrough(
        offsets: ChainOffsets,
        _config: &ProcessorConfig,
    ) -> Result<Box<dyn Processor>, PrepError> {
        Ok(Box::new(IdenticalProcessor::new(offsets)))
    }

    let mut registry = ProcessorRegistry::default();
    registry.register("passthrough", make_passthrough);

    let mut processor = registry
        .make("passthrough", &[], &ProcessorConfig::default())
        .unwrap();
    let block = array![[1.0], [2.0]];
    processor.fit(block.view()).unwrap();
    assert_eq!(processor.process(&block).unwrap(), block);
}

#[test]
fn test_unfitted_process_is_rejected() {
    let registry = ProcessorRegistry::default();
    let processor = registry
        .make("normalize", &[], &ProcessorConfig::default())
        .unwrap();
    assert!(matches!(
        processor.process(&array![[1.0]]),
        Err(PrepError::NotFitted(_))
    ));
}

#[test]
fn test_one_hot_recover_not_supported() {
    let registry = ProcessorRegistry::default();
    let mut processor = registry
        .make("one_hot", &[], &ProcessorConfig::default())
        .unwrap();
    let block = array![[0.0], [1.0], [2.0]];
    processor.fit(block.view()).unwrap();
    let processed = processor.process(&block).unwrap();
    assert!(matches!(
        processor.recover(&processed),
        Err(PrepError::NotSupported(_))
    ));
}
