use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand_distr::{Distribution, Normal};

use operator_registry::{
    params::kwargs, ExecutionContext, OperatorRegistry, RegistryOptions, Tensor,
};

// =====================================================================
// Helpers
// =====================================================================

fn random_tensor(shape: &[usize], rng: &mut StdRng) -> Tensor {
    let normal = Normal::new(0.0f32, 1.0).unwrap();
    let len: usize = shape.iter().product();
    let values = (0..len).map(|_| normal.sample(rng)).collect();
    Tensor::from_vec(shape, values).unwrap()
}

// =====================================================================
// Benchmarks
// =====================================================================

fn bench_create_property(c: &mut Criterion) {
    let registry = OperatorRegistry::with_builtin_operators(RegistryOptions::default()).unwrap();
    let config = kwargs([("hidden_units", "128"), ("bias", "true"), ("groups", "2")]);

    c.bench_function("create_property/FullyConnected", |b| {
        b.iter(|| registry.create_property(black_box("FullyConnected"), black_box(&config)).unwrap())
    });
}

fn bench_create_operator(c: &mut Criterion) {
    let registry = OperatorRegistry::with_builtin_operators(RegistryOptions::default()).unwrap();
    let property = registry
        .create_property("FullyConnected", &kwargs([("hidden_units", "128")]))
        .unwrap();

    c.bench_function("create_operator/cpu", |b| {
        b.iter(|| property.create_operator(black_box(ExecutionContext::cpu())).unwrap())
    });
}

fn bench_fully_connected_forward(c: &mut Criterion) {
    let registry = OperatorRegistry::with_builtin_operators(RegistryOptions::default()).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let mut group = c.benchmark_group("fully_connected_forward");

    for &(batch, features, hidden) in &[(32, 64, 128), (64, 256, 256), (128, 512, 1024)] {
        let property = registry
            .create_property("FullyConnected", &kwargs([("hidden_units", hidden.to_string())]))
            .unwrap();
        let shapes = property.infer_shape(&[Some(vec![batch, features])]).unwrap();
        let inputs: Vec<Tensor> = shapes
            .arguments
            .iter()
            .map(|s| random_tensor(s, &mut rng))
            .collect();
        let input_refs: Vec<&Tensor> = inputs.iter().collect();
        let op = property.create_operator(ExecutionContext::cpu()).unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}x{}", batch, features, hidden)),
            &input_refs,
            |b, inputs| {
                let mut outputs = vec![Tensor::new(&shapes.outputs[0])];
                b.iter(|| op.forward(black_box(inputs), &mut outputs).unwrap())
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_create_property, bench_create_operator, bench_fully_connected_forward);
criterion_main!(benches);
