use std::{env, process::ExitCode};

use keel::{Interpreter, Object, StderrTracer};

const USAGE: &str = "usage: keel [--heap-stats] [--trace] (<file.keel> | -c <source>)";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut heap_stats = false;
    let mut trace = false;
    let mut source: Option<String> = None;
    let mut file: Option<String> = None;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--heap-stats" => heap_stats = true,
            "--trace" => trace = true,
            "-c" => match iter.next() {
                Some(code) => source = Some(code),
                None => {
                    eprintln!("{USAGE}");
                    return ExitCode::FAILURE;
                }
            },
            _ if file.is_none() && !arg.starts_with('-') => file = Some(arg),
            _ => {
                eprintln!("{USAGE}");
                return ExitCode::FAILURE;
            }
        }
    }

    let mut interp = Interpreter::new();
    if trace {
        interp.set_tracer(Box::new(StderrTracer));
    }

    let result = match (source, file) {
        (Some(code), None) => interp.eval_string(&code),
        (None, Some(path)) => interp.eval_file(&path),
        _ => {
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    let code = match result {
        Ok(Object::Null) => ExitCode::SUCCESS,
        Ok(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(exception) => {
            eprintln!("{exception}");
            ExitCode::FAILURE
        }
    };

    if heap_stats {
        let stats = interp.heap_stats();
        eprintln!(
            "heap: {} live, {} free, {} total",
            stats.live_objects, stats.free_slots, stats.total_slots
        );
        for (kind, count) in &stats.objects_by_kind {
            eprintln!("  {kind}: {count}");
        }
    }

    code
}
