use std::io::{self, BufRead};

use relin_compiler::{compile, Options};

const USAGE: &str = "re [-d] [-i] [-m] PATTERN";

fn main() -> Result<(), String> {
    let (debug, options, args) = std::env::args().skip(1).fold(
        (false, Options::default(), vec![]),
        |(debug, options, mut args), arg| match arg.as_str() {
            "--debug" | "-d" => (true, options, args),
            "--ignore-case" | "-i" => (debug, options.with_case_insensitive(), args),
            "--multiline" | "-m" => (debug, options.with_multiline(), args),
            _ => {
                args.push(arg);
                (debug, options, args)
            }
        },
    );

    let pattern = match args.as_slice() {
        [pattern] => Ok(pattern.as_str()),
        _ => Err(USAGE.to_string()),
    }?;

    let program = compile(pattern, options).map_err(|e| e.to_string())?;

    if debug {
        println!(
            "DEBUG
--------
{}--------
",
            program
        )
    }

    for line in io::stdin().lock().lines() {
        match line {
            Ok(line) => {
                if program.is_match(line.as_bytes()) {
                    println!("{}", line)
                }
            }
            Err(e) => return Err(format!("{}", e)),
        }
    }

    Ok(())
}
