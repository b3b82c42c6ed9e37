//
// main.rs
//
// Command line entry point
//

use std::env;

use luadoc::cli::{analysis_stats, goto};

fn print_usage() {
    println!("luadoc {}, type name analysis for Lua doc annotations.", env!("CARGO_PKG_VERSION"));
    print!(
        r#"
Usage: luadoc <COMMAND> [OPTIONS]

Commands:

analysis-stats <path> [--csv] [--only <phase>] [--config <file>]
                             Time each analysis phase over a project
goto <path> <file>:<line>:<col> [--json] [--config <file>]
                             Print the declaration of the type name at a position

Available options:

--version                    Print the version
--help                       Print this help message

"#
    );
}

fn main() -> anyhow::Result<()> {
    let mut argv = env::args();
    argv.next(); // skip executable name

    let Some(command) = argv.next() else {
        print_usage();
        return Ok(());
    };

    env_logger::init();

    match command.as_str() {
        "analysis-stats" => {
            let args = analysis_stats::parse_args(&mut argv).map_err(|e| anyhow::anyhow!(e))?;
            let results = analysis_stats::run_analysis_stats(&args)?;
            if args.csv {
                analysis_stats::print_results_csv(&results);
            } else {
                analysis_stats::print_results(&results);
            }
            Ok(())
        }
        "goto" => {
            let args = goto::parse_args(&mut argv).map_err(|e| anyhow::anyhow!(e))?;
            let target = goto::run_goto(&args)?;
            goto::print_target(target.as_ref(), args.json)
        }
        "--version" => {
            println!("luadoc {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "--help" => {
            print_usage();
            Ok(())
        }
        other => Err(anyhow::anyhow!("Unknown argument: '{other}'")),
    }
}
