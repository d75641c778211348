use std::env;
use std::process::Command;

/// Opens the specified URL in the default browser using native commands
pub fn open_browser(url: &str) -> Result<(), std::io::Error> {
    let (program, args) = browser_command(env::consts::OS, url).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!("Unsupported OS: {}", env::consts::OS),
        )
    })?;
    Command::new(program).args(args).spawn()?;
    Ok(())
}

fn browser_command<'a>(os: &str, url: &'a str) -> Option<(&'static str, Vec<&'a str>)> {
    match os {
        "macos" => Some(("open", vec![url])),
        "windows" => Some(("cmd", vec!["/C", "start", url])),
        "linux" => Some(("xdg-open", vec![url])),
        _ => None,
    }
}
