use log::LevelFilter;

/// Print progress without a newline so `status!` can finish the line.
#[macro_export]
macro_rules! progress {
    ($($arg:tt)*) => {{
        print!($($arg)*);
        std::io::Write::flush(&mut std::io::stdout())?;
    }};
}

#[macro_export]
macro_rules! status {
    ($code:expr) => {{
        let ret = $code;
        match &ret {
            Ok(_) => println!("{}", colored::Colorize::green("ok")),
            Err(_) => println!("{}", colored::Colorize::red("failed")),
        }
        ret
    }};
}

/// Frame dumps and engine diagnostics go to stderr; `-v` raises the level,
/// `RUST_LOG` still wins.
pub fn init(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}
