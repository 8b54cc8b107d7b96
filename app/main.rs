use std::{
    env::current_dir,
    fs::create_dir,
    path::{Path, PathBuf},
    process::ExitCode,
};

use archiver::{Archiver, Config, Event, Observer, Timestamp};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(args_conflicts_with_subcommands = true)]
struct Arguments {
    #[clap(subcommand)]
    cmd: Option<Command>,
    #[arg(help = "only archive these entries of the working directory")]
    paths: Vec<PathBuf>,
    #[arg(long, help = "name of the repository directory")]
    repository: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[clap(about = "create a repository in the working directory")]
    Init,
}

/// Progress goes to stdout, problems to stderr. Directories are shown
/// relative to the directory the run started in.
struct Console {
    root: PathBuf,
}

impl Console {
    /// `./` for the run's root, `./sub/dir/` below it.
    fn relative(&self, dir: &Path) -> String {
        match dir.strip_prefix(&self.root) {
            Ok(rest) if rest.as_os_str().is_empty() => String::from("./"),
            Ok(rest) => format!("./{}/", rest.display()),
            Err(_) => dir.display().to_string(),
        }
    }
}

impl Observer for Console {
    fn event(&mut self, event: Event) {
        match event {
            Event::Archiving(dir) => println!("Archiving {}", self.relative(&dir)),
            Event::StoringFile(path) => println!("storing file {}", name(&path)),
            Event::StoringLink(path) => println!("storing link {}", name(&path)),
            Event::StoringDir(path) => println!("storing dir {}", self.relative(&path)),
            Event::Problem(problem) => eprintln!("archive: error: {}", problem),
        }
    }
}

fn name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Arguments::parse();
    match run(args) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(problems) => {
            log::info!("{} entries skipped", problems);
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("archive: error: {}", err);
            ExitCode::from(2)
        }
    }
}

fn run(args: Arguments) -> Result<usize, archiver::Error> {
    let dir = current_dir()?;
    let mut config = Config::load(&dir)?;
    if let Some(repository) = args.repository {
        config.repository = repository;
    }
    match args.cmd {
        Some(Command::Init) => {
            let repository = dir.join(&config.repository);
            if !repository.is_dir() {
                create_dir(&repository)?;
                println!("made repository directory {}", config.repository);
            }
            Ok(0)
        }
        None => {
            let now = Timestamp::now()?;
            let mut console = Console { root: dir.clone() };
            let archived = Archiver::new(&config, now, &mut console).run(&dir, &args.paths)?;
            log::debug!("top level summary:\n{}", archived.summary);
            Ok(archived.problems)
        }
    }
}

#[test]
fn test_console_paths_are_relative() {
    let console = Console {
        root: PathBuf::from("/home/me/work"),
    };
    assert_eq!(console.relative(Path::new("/home/me/work")), "./");
    assert_eq!(console.relative(Path::new("/home/me/work/sub")), "./sub/");
    assert_eq!(console.relative(Path::new("/home/me/work/sub/deeper")), "./sub/deeper/");
    assert_eq!(console.relative(Path::new("/elsewhere")), "/elsewhere");
}
