use colored::{Color, ColoredString, Colorize};
use crossterm::terminal;

use crate::testing::{ExecutionResult, RunSummary, TestStatus};

pub fn is_truecolor_supported() -> bool {
    let Ok(v) = std::env::var("COLORTERM") else {
        return false
    };
    match v.as_str() {
        "truecolor" | "24bit" => true,
        _ => false,
    }
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for TestStatus {
    fn color(&self) -> Color {
        use TestStatus::*;
        if !self::is_truecolor_supported() {
            return match self {
                Pass => Color::Green,
                Fail => Color::Red,
                Timeout => Color::Yellow,
                Error => Color::Magenta,
            };
        }

        match self {
            Pass => Color::TrueColor {
                r: 30,
                g: 180,
                b: 40,
            },
            Fail => Color::TrueColor {
                r: 220,
                g: 42,
                b: 42,
            },
            Timeout => Color::TrueColor {
                r: 210,
                g: 138,
                b: 4,
            },
            Error => Color::TrueColor {
                r: 171,
                g: 40,
                b: 200,
            },
        }
    }
}

pub fn status_icon(status: TestStatus) -> ColoredString {
    let fg = if is_truecolor_supported() {
        Color::TrueColor {
            r: 255,
            g: 255,
            b: 255,
        }
    } else {
        Color::BrightBlack
    };
    format!(" {} ", status)
        .on_color(status.color())
        .bold()
        .color(fg)
}

/// One console line per completed test.
pub fn print_test_line(res: &ExecutionResult) {
    println!(
        "{}{} {} [{}ms]",
        status_icon(res.status),
        " ".repeat(9usize.saturating_sub(res.status.to_string().len() + 2)),
        res.name,
        res.execution_time.as_millis(),
    );
}

pub fn print_run_summary(summary: &RunSummary) {
    let bar = "-".repeat(5);
    print!("{} ", bar);

    let count = summary.count_by_status();
    let num_total_test = summary.results.len();
    let num_passed = summary.num_passed();
    let num_failed = num_total_test - num_passed;

    if num_passed == num_total_test {
        let msg = format!("All {} tests passed ✨", num_total_test);
        print!("{}", msg.green());
    } else {
        let summary_msg = if num_passed > 0 {
            format!("{}/{} tests failed 💣", num_failed, num_total_test)
        } else {
            format!("All {} tests failed 💀", num_total_test)
        };

        let detail_msg = count
            .iter()
            .filter(|(&status, _)| !status.is_pass())
            .map(|(&status, &cnt)| {
                format!(
                    "{}{}{}",
                    self::status_icon(status),
                    "x".dimmed(),
                    cnt.to_string().bold().bright_white(),
                )
            })
            .collect::<Vec<String>>()
            .join(", ");

        print!("{} ({})", summary_msg.bright_red(), detail_msg);
    }

    if summary.interrupted {
        print!(" {}", "[interrupted]".bright_yellow().bold());
    }

    println!(" {}", bar);
}

/// Full captured output of one non-passing test, under a terminal-width rule.
pub fn print_failure_detail(res: &ExecutionResult) {
    let (cols, _) = terminal::size().unwrap_or((40, 40));

    const BOLD_LINE: &str = "━";
    const THIN_LINE: &str = "─";

    let bold_bar = BOLD_LINE.repeat(cols as usize).blue().bold();

    let exit_code = match res.exit_code {
        Some(code) => format!("exit {}", code),
        None => "no exit code".to_owned(),
    };
    println!(
        "\n{}: {} ({}) [{}ms]\n{}",
        res.name.bright_yellow().bold(),
        self::status_icon(res.status),
        exit_code,
        res.execution_time.as_millis(),
        bold_bar,
    );

    fn print_sub_title(s: &str, cols: usize) {
        println!(
            "{}{}",
            s.cyan().bold(),
            THIN_LINE.repeat(cols.saturating_sub(s.len() + 1)).bright_black(),
        )
    }

    fn print_captured(text: &str) {
        if text.is_empty() {
            println!("{}", "<EMPTY>".magenta().dimmed());
            return;
        }
        print!("{}", text);
        if !text.ends_with('\n') {
            println!("{}", " Missing new line ".on_yellow().black().bold());
        }
    }

    print_sub_title("[stdout]", cols as usize);
    print_captured(&res.stdout);

    print_sub_title("[stderr]", cols as usize);
    print_captured(&res.stderr);

    println!("{}", bold_bar);
}
