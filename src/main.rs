use clap::{Arg, ArgAction, Command};
use rsback::{load_job, render_command, run_job, BackupJob, RsbackError};
use std::path::Path;
use std::process;

fn main() {
    match run() {
        Ok(exit_code) => process::exit(exit_code),
        Err(error) => {
            eprintln!("Error: {error}");
            process::exit(error.exit_code());
        }
    }
}

fn run() -> Result<i32, RsbackError> {
    let matches = Command::new("rsback")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Runs declarative rsync backup jobs with segregated run logs")
        .long_about(
            "rsback compiles an INI job description into an rsync command line,\n\
             runs it, and keeps three log channels for the run: a persistent\n\
             actions log, a transient progress log, and an errors log that is\n\
             kept only when something actually went wrong.",
        )
        .arg(
            Arg::new("job")
                .help("Job description file (INI)")
                .required(true)
                .value_name("JOB_FILE"),
        )
        .arg(
            Arg::new("dry-run")
                .short('n')
                .long("dry-run")
                .help("Pass --dry-run/--itemize-changes to rsync")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("exclude")
                .long("exclude")
                .help("Additional exclude pattern (repeatable)")
                .action(ArgAction::Append)
                .value_name("PATTERN"),
        )
        .arg(
            Arg::new("show-command")
                .long("show-command")
                .help("Print the rsync command line and exit without running it")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let Some(job_file) = matches.get_one::<String>("job") else {
        return Err(RsbackError::config(
            "No job file specified. Use --help for usage information.",
        ));
    };

    let mut config = load_job(Path::new(job_file))?;

    // command-line flags override/extend the job file
    if matches.get_flag("dry-run") {
        config.dry_run = true;
    }
    if let Some(patterns) = matches.get_many::<String>("exclude") {
        config.exclude.extend(patterns.cloned());
    }

    let cwd = std::env::current_dir()?;
    let job = BackupJob::new(config, &cwd)?;

    if matches.get_flag("show-command") {
        println!("{}", render_command(&job));
        return Ok(0);
    }

    run_job(&job)
}
