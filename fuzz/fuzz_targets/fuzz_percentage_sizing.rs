#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tabula_layout::SizeAllocator;

#[derive(Debug, Arbitrary)]
struct Input {
    default_size: u8,
    available: u16,
    count: u8,
    dpi: u8,
    mins: Vec<(u8, u8)>,
    pinned: Vec<(u8, u8)>,
    hidden: Vec<u8>,
    resizes: Vec<(u8, u16)>,
}

fuzz_target!(|input: Input| {
    let count = usize::from(input.count % 48);
    let mut alloc = SizeAllocator::new(u32::from(input.default_size));
    alloc.set_dpi(96 + u32::from(input.dpi % 4) * 24);
    alloc.set_percentage_sizing(true);
    for (p, min) in input.mins.into_iter().take(16) {
        alloc.set_min_size(usize::from(p), u32::from(min));
    }
    for (p, pct) in input.pinned.into_iter().take(4) {
        alloc.set_percentage(usize::from(p), f64::from(pct % 40));
    }
    alloc.set_hidden(input.hidden.into_iter().take(8).map(usize::from));
    let available = u32::from(input.available);
    alloc.calculate_percentages(available, count);

    let total = |alloc: &SizeAllocator| -> u64 { (0..count).map(|p| u64::from(alloc.get_size(p))).sum() };
    assert_eq!(alloc.get_aggregate_size(count), total(&alloc), "aggregate drift");
    for p in 0..count {
        if alloc.is_hidden(p) {
            assert_eq!(alloc.get_size(p), 0, "hidden position has width");
        }
    }

    for (p, size) in input.resizes.into_iter().take(16) {
        alloc.set_size(usize::from(p), u32::from(size));
        let after = total(&alloc);
        assert_eq!(alloc.get_aggregate_size(count), after, "aggregate drift after resize");
    }
});
