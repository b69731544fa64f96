//! Benchmark for the priority scheduler's sampling-based selection pass.
//!
//! ```bash
//! cargo bench --bench scheduler_sample -- --noplot
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use maiter_core::kernel::IterateKernel;
use maiter_core::scheduler::PriorityScheduler;

struct PriorityIsDeltaKernel;
impl IterateKernel<u64, f64, ()> for PriorityIsDeltaKernel {
    fn read_data(&self, _line: &str) -> Option<(u64, (), usize)> {
        None
    }
    fn init_v(&self, _k: &u64, _data: &()) -> f64 {
        0.0
    }
    fn init_c(&self, _k: &u64, _data: &()) -> f64 {
        0.0
    }
    fn process_delta_v(&self, _k: &u64, delta: f64, _value: &f64, _data: &()) -> f64 {
        delta
    }
    fn g_func(&self, _k: &u64, _delta: &f64, _value: &f64, _data: &(), _output: &mut Vec<(u64, f64)>) {}
    fn accumulate(&self, a: f64, b: &f64) -> f64 {
        a + b
    }
    fn priority(&self, _value: &f64, delta: &f64) -> f64 {
        *delta
    }
    fn default_v(&self) -> f64 {
        0.0
    }
}

fn select_at_scale(c: &mut Criterion) {
    let kernel = PriorityIsDeltaKernel;
    let mut group = c.benchmark_group("scheduler_select");
    for &n in &[10_000usize, 100_000usize] {
        let rows: Vec<(u64, f64, f64)> = (0..n).map(|i| (i as u64, i as f64, 0.0)).collect();
        group.bench_function(BenchmarkId::new("portion_0.1", n), |b| {
            b.iter(|| black_box(PriorityScheduler.select(&rows, 0.1, &kernel)));
        });
    }
    group.finish();
}

criterion_group!(
    name = scheduler_sample;
    config = Criterion::default().without_plots();
    targets = select_at_scale
);
criterion_main!(scheduler_sample);
