use anstream::{AutoStream, ColorChoice};
use anstyle::{AnsiColor, Style};
use std::error::Error;
use std::io::Write;

/// Progress callbacks for the build engine. The engine itself never prints;
/// diagnostics go through whatever listener the driver supplies.
pub trait Listener {
    fn warning(&self, s: String);
    fn info(&self, s: String);

    fn progress(&self, operation: &str, detail: String) {
        self.info(format!("{operation}: {detail}"));
    }

    fn error(&self, error: &dyn Error) {
        let mut out = std::io::stderr().lock();
        let _ = writeln!(out, "mkdeb: {error}");
    }
}

pub struct NoOpListener;
impl Listener for NoOpListener {
    fn info(&self, _s: String) {}
    fn warning(&self, _s: String) {}
    fn progress(&self, _op: &str, _s: String) {}
}

pub struct StdErrListener {
    pub verbose: bool,
    pub quiet: bool,
    pub color: ColorChoice,
}

impl StdErrListener {
    fn label(&self, label: &str, style: Style, text: &str) {
        let mut out = AutoStream::new(std::io::stderr(), self.color).lock();
        let _ = writeln!(out, "{style}{label}{style:#}: {text}");
    }
}

impl Listener for StdErrListener {
    fn warning(&self, s: String) {
        if !self.quiet {
            self.label("warning", Style::new().bold().fg_color(Some(AnsiColor::Yellow.into())), &s);
        }
    }

    fn info(&self, s: String) {
        if self.verbose {
            self.label("info", Style::new().bold().fg_color(Some(AnsiColor::Cyan.into())), &s);
        }
    }

    fn progress(&self, operation: &str, detail: String) {
        if self.verbose {
            let mut out = AutoStream::new(std::io::stderr(), self.color).lock();
            let style = Style::new().bold().fg_color(Some(AnsiColor::Green.into()));
            let _ = writeln!(out, "{style}{operation:>12}{style:#} {detail}");
        }
    }

    fn error(&self, err: &dyn Error) {
        let mut causes = String::new();
        let mut cause = err.source();
        while let Some(err) = cause {
            causes = format!("{causes}\n  caused by: {err}");
            cause = err.source();
        }
        let mut out = AutoStream::new(std::io::stderr(), self.color).lock();
        let style = Style::new().bold().fg_color(Some(AnsiColor::Red.into()));
        let _ = writeln!(out, "{style}error{style:#}: {err}{causes}");
    }
}
