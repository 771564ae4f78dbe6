//! Criterion benchmarks for the chart editors.
//!
//! Run with:
//!   cargo bench
//!
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use echotune::model::{ScheduleVector, WeightSlot, WeightVector};
use echotune::schedule_editor::ScheduleEditor;
use echotune::surface::DisplayList;
use echotune::weight_editor::{WeightEditor, CENTER, RADIUS};

/// Point drag on the schedule chart: one redraw per move event.
fn bench_schedule_drag(c: &mut Criterion) {
    let mut group = c.benchmark_group("schedule_drag");

    for moves in [16u64, 64, 256].iter() {
        group.throughput(Throughput::Elements(*moves));
        group.bench_with_input(BenchmarkId::new("moves", moves), moves, |b, &moves| {
            let mut editor = ScheduleEditor::new(DisplayList::new(600.0, 320.0));
            b.iter(|| {
                let mut schedule = ScheduleVector::uniform(0.5);
                let x = editor.index_to_x(1);
                let y = editor.value_to_y(schedule[1]);
                editor.pointer_down(&schedule, x, y);
                for i in 0..moves {
                    editor.pointer_move(&mut schedule, 40.0 + (i % 240) as f64);
                }
                editor.pointer_up(&schedule);
                black_box(schedule[1])
            });
        });
    }

    group.finish();
}

/// Wheel zoom and pan; exercises tick generation at shrinking spans.
fn bench_schedule_zoom(c: &mut Criterion) {
    c.bench_function("schedule_zoom_pan", |b| {
        let mut editor = ScheduleEditor::new(DisplayList::new(600.0, 320.0));
        let mut schedule = ScheduleVector::uniform(0.3);
        b.iter(|| {
            for _ in 0..20 {
                editor.wheel(&schedule, 150.0, -1.0);
            }
            editor.pointer_down(&schedule, 590.0, 150.0);
            editor.pointer_move(&mut schedule, 170.0);
            editor.pointer_up(&schedule);
            for _ in 0..20 {
                editor.wheel(&schedule, 150.0, 1.0);
            }
            black_box(editor.window().span())
        });
    });
}

/// Boundary drag around the weight donut.
fn bench_weight_drag(c: &mut Criterion) {
    c.bench_function("weight_boundary_drag", |b| {
        let mut editor = WeightEditor::new(DisplayList::new(300.0, 300.0));
        let (cx, cy) = CENTER;
        let r = RADIUS - 5.0;
        b.iter(|| {
            let mut weights = WeightVector::default();
            // The first boundary sits at 120 degrees for equal weights.
            let a = std::f64::consts::TAU / 3.0;
            editor.pointer_down(&weights, cx + r * a.sin(), cy - r * a.cos());
            for step in 0..64 {
                let t = a + (step as f64) * 0.01;
                editor.pointer_move(&mut weights, cx + r * t.sin(), cy - r * t.cos());
            }
            editor.pointer_up();
            editor.set_slider(&mut weights, WeightSlot::Tuner, 0.2);
            black_box(weights.as_array())
        });
    });
}

criterion_group!(
    benches,
    bench_schedule_drag,
    bench_schedule_zoom,
    bench_weight_drag
);
criterion_main!(benches);
