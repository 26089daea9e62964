#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tabula_core::{Axis, DataSource, IndexChange, SharedDimensions};
use tabula_layer::{Command, LayerStack};
use tabula_layout::SizingConfig;

#[derive(Debug, Arbitrary)]
enum Op {
    Hide(Vec<u8>),
    Show(Vec<u8>),
    ShowAll,
    ShowAdjacent { position: u8, toward_start: bool, cascade: bool },
    Reorder { from: Vec<u8>, to: u8 },
    Resize { position: u8, size: u16 },
    Percentage { position: u8, percentage: u8 },
    ClientArea(u16),
    Scroll(u8),
    Insert { at: u8, count: u8 },
    Delete { at: u8, count: u8 },
    Reset,
}

#[derive(Debug, Arbitrary)]
struct Input {
    columns: u8,
    percentage: bool,
    ops: Vec<(bool, Op)>,
}

fuzz_target!(|input: Input| {
    let dims = SharedDimensions::new(usize::from(input.columns % 64), usize::from(input.columns % 17));
    let mut config = SizingConfig::default();
    config.columns.percentage_sizing = input.percentage;
    config.rows.percentage_sizing = input.percentage;
    let mut stack = LayerStack::standard(dims.clone(), &config);

    for (vertical, op) in input.ops.into_iter().take(64) {
        let axis = if vertical { Axis::Row } else { Axis::Column };
        let bytes = |v: Vec<u8>| v.into_iter().map(usize::from).collect::<Vec<_>>();
        match op {
            Op::Hide(p) => {
                stack.execute(Command::Hide { axis, positions: bytes(p) });
            }
            Op::Show(i) => {
                stack.execute(Command::Show { axis, indexes: bytes(i) });
            }
            Op::ShowAll => {
                stack.execute(Command::ShowAll { axis });
            }
            Op::ShowAdjacent { position, toward_start, cascade } => {
                stack.execute(Command::ShowAdjacent {
                    axis,
                    position: usize::from(position),
                    toward_start,
                    cascade,
                });
            }
            Op::Reorder { from, to } => {
                stack.execute(Command::Reorder { axis, from: bytes(from), to: usize::from(to) });
            }
            Op::Resize { position, size } => {
                stack.execute(Command::Resize {
                    axis,
                    position: usize::from(position),
                    size: u32::from(size),
                });
            }
            Op::Percentage { position, percentage } => {
                stack.execute(Command::SetPercentage {
                    axis,
                    position: usize::from(position),
                    percentage: f64::from(percentage),
                });
            }
            Op::ClientArea(available) => {
                stack.execute(Command::ClientAreaResized { axis, available: u32::from(available) });
            }
            Op::Scroll(origin) => {
                stack.execute(Command::Scroll { axis, origin: usize::from(origin) });
            }
            Op::Insert { at, count } => {
                let at = usize::from(at).min(dims.count(axis));
                let change = dims.apply(axis, IndexChange::insert(at, usize::from(count % 8)));
                stack.apply_data_change(axis, change);
            }
            Op::Delete { at, count } => {
                let total = dims.count(axis);
                let at = usize::from(at);
                if at < total {
                    let count = usize::from(count % 8).min(total - at);
                    let change = dims.apply(axis, IndexChange::delete(at, count));
                    stack.apply_data_change(axis, change);
                }
            }
            Op::Reset => {
                stack.execute(Command::ResetSizes { axis });
            }
        }

        // Post-conditions that must always hold:
        for axis in [Axis::Column, Axis::Row] {
            let shown = stack.indexes(axis);
            let count = stack.position_count(axis);
            assert_eq!(shown.len(), count, "gap in top-level positions");
            for (p, &index) in shown.iter().enumerate() {
                assert!(index < dims.count(axis), "index beyond data extent");
                assert_eq!(stack.position_by_index(axis, index), Some(p), "round trip");
            }
            let mut x = 0u64;
            for p in 0..count {
                assert_eq!(stack.start_pixel(axis, p), x, "start pixel drift");
                x += u64::from(stack.size(axis, p));
            }
        }
    }
});
