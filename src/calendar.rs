use jiff::{Timestamp, civil::Date};

use crate::models::CalendarEvent;

const PRODID: &str = "-//kinofeed//perm-cinema//EN";

/// Render events as an RFC 5545 calendar. Deterministic: the same
/// inputs always produce identical bytes, so feed pollers see no
/// spurious diffs.
pub fn render(name: &str, description: &str, events: &[CalendarEvent]) -> String {
    let mut out = String::new();

    push_line(&mut out, "BEGIN:VCALENDAR");
    push_line(&mut out, "VERSION:2.0");
    push_line(&mut out, &format!("PRODID:{PRODID}"));
    push_line(&mut out, "CALSCALE:GREGORIAN");
    push_line(&mut out, "METHOD:PUBLISH");
    push_line(&mut out, &format!("X-WR-CALNAME:{}", escape_text(name)));
    push_line(&mut out, &format!("X-WR-CALDESC:{}", escape_text(description)));

    for event in events {
        push_line(&mut out, "BEGIN:VEVENT");
        push_line(&mut out, &format!("UID:{}-{}@kinofeed", event.slug, event.date));
        push_line(&mut out, &format!("DTSTAMP:{}", format_utc(event.published_at)));
        push_line(&mut out, &format!("DTSTART;VALUE=DATE:{}", format_date(event.date)));
        push_line(&mut out, &format!("DTEND;VALUE=DATE:{}", format_date(event.date)));
        push_line(&mut out, &format!("SUMMARY:{}", escape_text(&event.summary)));
        push_line(&mut out, &format!("DESCRIPTION:{}", escape_text(&event.description)));
        if let Some(url) = &event.url {
            push_line(&mut out, &format!("URL:{}", escape_text(url)));
        }
        push_line(&mut out, "CATEGORIES:foreign-film,cinema");
        push_line(&mut out, "END:VEVENT");
    }

    push_line(&mut out, "END:VCALENDAR");
    out
}

fn format_date(date: Date) -> String {
    format!("{:04}{:02}{:02}", date.year(), date.month(), date.day())
}

fn format_utc(unix_seconds: i64) -> String {
    let ts = Timestamp::from_second(unix_seconds).unwrap_or(Timestamp::UNIX_EPOCH);
    ts.strftime("%Y%m%dT%H%M%SZ").to_string()
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {},
            _ => out.push(c),
        }
    }
    out
}

/// Content lines are folded at 75 octets with a CRLF + space
/// continuation, splitting only on UTF-8 boundaries.
fn push_line(out: &mut String, line: &str) {
    const LIMIT: usize = 75;

    let mut remaining = line;
    let mut first = true;
    while !remaining.is_empty() {
        let budget = if first { LIMIT } else { LIMIT - 1 };
        let take = floor_char_boundary(remaining, budget.min(remaining.len()));
        if !first {
            out.push(' ');
        }
        out.push_str(&remaining[..take]);
        out.push_str("\r\n");
        remaining = &remaining[take..];
        first = false;
    }
    if first {
        out.push_str("\r\n");
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index.max(1)
}
