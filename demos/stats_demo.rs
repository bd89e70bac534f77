use std::collections::hash_map::RandomState;

use clap::Parser;
use robin_hood_map::HashMap;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Erase every n-th key after filling, to show the effect of backward
    /// shifts on probe lengths. Zero disables erasing.
    #[arg(short = 'e', long = "erase_every", default_value_t = 0)]
    erase_every: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Coord {
    x: i32,
    y: i32,
}

fn coord(i: usize) -> Coord {
    let i = i as i32;
    Coord {
        x: i * 7 + 13,
        y: i * 3 - 500,
    }
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating HashMap with target capacity: {}",
        args.target_capacity
    );

    let mut map: HashMap<Coord, usize, RandomState> =
        HashMap::with_capacity_and_hasher(args.target_capacity, RandomState::new());

    println!("Actual capacity: {}", map.capacity());
    println!("Filling map with coordinate keys...");

    let num_values = map.capacity();
    for i in 0..num_values {
        map.insert_or_update(coord(i), i);
    }

    if args.erase_every > 0 {
        let erased = (0..num_values)
            .step_by(args.erase_every)
            .filter(|&i| map.erase(&coord(i)))
            .count();
        println!("Erased {erased} keys");
    }

    println!("Map holds {} entries", map.len());
    let stats = map.debug_stats();
    println!("Final load factor: {:.2}%", stats.load_factor * 100.0);
    println!(
        "Probe lengths: max {}, mean {:.3}",
        stats.max_psl, stats.mean_psl
    );

    map.probe_histogram().print();
    stats.print();
}
