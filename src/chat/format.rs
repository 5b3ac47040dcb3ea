//! Reply formatting: turns the model's markdown-ish text into HTML markup.

use std::sync::LazyLock;

use regex::Regex;

const LINE_BREAK: &str = "<br>";

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*]+?)\*").expect("italic pattern"));
static CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("code pattern"));
static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\.\s+(.*)$").expect("numbered list pattern"));
static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-•]\s+(.*)$").expect("bullet pattern"));
static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:Workout|Exercise|Day \d+):)(.*)$").expect("header pattern")
});
static BOLD_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<strong>(?:Workout|Exercise|Day \d+):").expect("bold header pattern")
});

/// Convert reply text into display markup.
///
/// Steps run in a fixed order, each over the output of the previous one:
/// line breaks become `<br>`; `**bold**`, then `*italic*`, then `` `code` ``
/// spans are wrapped; then, per line, numbered-list items, bullet items
/// (`-` or `•`), and section headers (`Workout:`, `Exercise:`, `Day N:`) are
/// marked up; finally an empty line is inserted before every bold header
/// line except the first line.
///
/// Not idempotent: feeding the output back in adds another spacer before
/// each header.
pub fn renderable_text(content: &str) -> String {
    let text = content.replace("\r\n", "\n").replace('\n', LINE_BREAK);
    let text = BOLD.replace_all(&text, "<strong>${1}</strong>");
    let text = ITALIC.replace_all(&text, "<em>${1}</em>");
    let text = CODE.replace_all(&text, "<code>${1}</code>");

    let mut lines: Vec<String> = text.split(LINE_BREAK).map(str::to_string).collect();

    for line in lines.iter_mut() {
        *line = NUMBERED
            .replace(line.as_str(), r#"<span class="list-number">${1}.</span> ${2}"#)
            .into_owned();
    }
    for line in lines.iter_mut() {
        *line = BULLET
            .replace(line.as_str(), r#"<span class="list-bullet">•</span> ${1}"#)
            .into_owned();
    }
    for line in lines.iter_mut() {
        *line = HEADER.replace(line.as_str(), "<strong>${1}</strong>${2}").into_owned();
    }
    for line in lines.iter_mut().skip(1) {
        if BOLD_HEADER.is_match(line.as_str()) {
            line.insert_str(0, LINE_BREAK);
        }
    }

    lines.join(LINE_BREAK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_line_breaks() {
        assert_eq!(renderable_text("a\nb\r\nc"), "a<br>b<br>c");
    }

    #[test]
    fn wraps_inline_emphasis() {
        assert_eq!(
            renderable_text("**Push** hard, *breathe*, use `RPE 8`"),
            "<strong>Push</strong> hard, <em>breathe</em>, use <code>RPE 8</code>"
        );
    }

    #[test]
    fn marks_numbered_and_bullet_lines() {
        let out = renderable_text("1. Squats\n- Rest 60s\n• Stretch");
        assert_eq!(
            out,
            concat!(
                r#"<span class="list-number">1.</span> Squats<br>"#,
                r#"<span class="list-bullet">•</span> Rest 60s<br>"#,
                r#"<span class="list-bullet">•</span> Stretch"#
            )
        );
    }

    #[test]
    fn bold_day_header_then_bullet() {
        let out = renderable_text("**Day 1:** Squats\n- 3 sets");
        // Bold runs before the header step, so the header is wrapped once,
        // and the bullet belongs to the second line, not to "Squats".
        assert_eq!(
            out,
            r#"<strong>Day 1:</strong> Squats<br><span class="list-bullet">•</span> 3 sets"#
        );
        assert_eq!(out.matches("<strong>").count(), 1);
    }

    #[test]
    fn plain_headers_are_bolded_and_spaced() {
        let out = renderable_text("Warm up first.\nWorkout: Legs\nDay 2: Rest");
        assert_eq!(
            out,
            "Warm up first.<br><br><strong>Workout:</strong> Legs<br><br><strong>Day 2:</strong> Rest"
        );
    }

    #[test]
    fn header_on_first_line_gets_no_spacer() {
        assert_eq!(
            renderable_text("Exercise: Plank"),
            "<strong>Exercise:</strong> Plank"
        );
    }

    #[test]
    fn header_must_start_the_line() {
        assert_eq!(renderable_text("Next Workout: soon"), "Next Workout: soon");
    }

    #[test]
    fn is_not_idempotent() {
        let once = renderable_text("Intro\nWorkout: Legs");
        let twice = renderable_text(&once);
        assert_ne!(once, twice);
        assert_eq!(twice.matches("<br>").count(), once.matches("<br>").count() + 1);
    }
}
