use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tinyg_planner::planner::{AxisLimits, MotionPlanner, PlannerLimits};
use tinyg_planner::types::{MotionMode, Vector, MAX_AXES};

fn limits() -> PlannerLimits {
    let axis = AxisLimits {
        feedrate_max: 1200.0,
        velocity_max: 1200.0,
        jerk_max: 5e7,
        junction_deviation: 0.05,
    };
    PlannerLimits { axes: [axis; MAX_AXES] }
}

fn vec_xy(x: f64, y: f64) -> Vector {
    let mut v = Vector::ZERO;
    v.axes[0] = x;
    v.axes[1] = y;
    v
}

// Measures one submit_line call, including the back-planning pass it
// triggers, against a nearly-full 32-deep queue of zig-zagging moves --
// the worst case for the back-planning walk's length.
fn benchmark_submit_into_deep_queue(c: &mut Criterion) {
    c.bench_function("submit_line_into_deep_zigzag_queue", |b| {
        b.iter_batched(
            || {
                let mut planner: MotionPlanner<32> = MotionPlanner::new(limits());
                for i in 0..30 {
                    let x = (i + 1) as f64 * 5.0;
                    let y = if i % 2 == 0 { 0.0 } else { 5.0 };
                    planner.submit_line(vec_xy(x, y), 5.0 / 1200.0, MotionMode::Feed).unwrap();
                }
                planner
            },
            |mut planner| {
                planner.submit_line(black_box(vec_xy(200.0, 0.0)), black_box(5.0 / 1200.0), MotionMode::Feed).unwrap();
                planner
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

// Measures a long straight-line move's profile computation alone (a
// single-buffer queue, so back-planning walks exactly one entry).
fn benchmark_single_long_move(c: &mut Criterion) {
    let mut planner: MotionPlanner<4> = MotionPlanner::new(limits());
    c.bench_function("submit_single_long_move", |b| {
        b.iter(|| {
            planner.submit_line(black_box(vec_xy(150.0, 50.0)), black_box(150.0 / 1200.0), MotionMode::Feed).unwrap();
            planner.mark_running();
            planner.pop_completed();
        })
    });
}

criterion_group!(benches, benchmark_submit_into_deep_queue, benchmark_single_long_move);
criterion_main!(benches);
