
use pdse::*;

fn main() {
	better_panic::install();

	simplelog::TermLogger::init(
		simplelog::LevelFilter::Debug,
		simplelog::Config::default(),
		simplelog::TerminalMode::Mixed,
	).expect("could not initialize logger");

	demo_diamond();
	demo_straight_line();
}

// Entry -> {Left, Right} -> Merge, where both arms store the same value. The two stores
// are partially dead and a single store sinks to the merge.
fn demo_diamond() {
	let mut b = FuncBuilder::new("diamond");

	let entry = b.block();
	let left  = b.block();
	let right = b.block();
	let merge = b.block();

	b.edge(entry, left);
	b.edge(entry, right);
	b.edge(left,  merge);
	b.edge(right, merge);

	let x = b.alloc(entry);
	b.store(left,  x, 1);
	b.store(right, x, 1);
	b.load(merge, x);

	run_demo(b.finish(), &[&[0], &[1]]);
}

// A store migrating down a straight line of blocks to the block that reads it.
fn demo_straight_line() {
	let mut b = FuncBuilder::new("straight line");

	let entry = b.block();
	let mid   = b.block();
	let tail  = b.block();

	b.edge(entry, mid);
	b.edge(mid, tail);

	let x = b.alloc(entry);
	b.store(entry, x, 7);
	b.other(mid);
	b.load(tail, x);

	run_demo(b.finish(), &[&[]]);
}

fn run_demo(mut func: Function, paths: &[&[usize]]) {
	println!("before:\n{:?}", func);

	let reads_before = paths.iter().map(|p| eval_path(&func, p)).collect::<Vec<_>>();

	match func.sink_partial_dead_stores() {
		Ok(report) => {
			println!("after:\n{:?}", func);
			println!("{:#?}", report);

			for (path, before) in paths.iter().zip(reads_before.iter()) {
				assert_eq!(&eval_path(&func, path), before, "reads changed on path {:?}", path);
			}

			println!("reads preserved on all {} demo paths\n", paths.len());
		}

		Err(e) => {
			log::error!("{}", e);
		}
	}
}
