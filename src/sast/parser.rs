//! Line-oriented parser for bandit's text report
//!
//! The report is a sequence of issue blocks:
//!
//! ```text
//! >> Issue: [B602:subprocess_popen_with_shell_equals_true] subprocess call with shell=True identified
//!    Severity: High   Confidence: High
//!    CWE: CWE-78 (https://cwe.mitre.org/data/definitions/78.html)
//!    More Info: https://bandit.readthedocs.io/en/latest/plugins/b602.html
//!    Location: ./app.py:10:4
//! 9
//! 10      subprocess.call(cmd, shell=True)
//! --------------------------------------------------
//! ```
//!
//! followed by a `Code scanned:` summary. Everything outside issue blocks is ignored.

use super::Finding;
use regex::Regex;
use std::sync::OnceLock;

const ISSUE_HEADER: &str = ">> Issue:";
const END_OF_REPORT: &str = "Code scanned:";
const BLOCK_SEPARATOR: &str = "----------";

#[derive(Debug)]
enum ParserState {
    /// Between issue blocks (or before the first one)
    AwaitingIssue,
    /// Collecting fields for the current issue
    InIssue(Finding),
    /// End-of-report marker seen or input exhausted
    Done,
}

/// What a single line means to the parser
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    IssueHeader(&'a str),
    SeverityConfidence { severity: &'a str, confidence: &'a str },
    Cwe { id: &'a str, url: &'a str },
    MoreInfo(&'a str),
    Location { location: &'a str, line: Option<usize> },
    Separator,
    EndOfReport,
    Other,
}

fn classify(raw: &str) -> Line<'_> {
    static SEVERITY_RE: OnceLock<Regex> = OnceLock::new();
    static CWE_RE: OnceLock<Regex> = OnceLock::new();
    static LOCATION_RE: OnceLock<Regex> = OnceLock::new();

    let line = raw.trim();

    if let Some(rest) = line.strip_prefix(ISSUE_HEADER) {
        return Line::IssueHeader(rest.trim());
    }
    if line.starts_with(END_OF_REPORT) {
        return Line::EndOfReport;
    }
    if line.starts_with(BLOCK_SEPARATOR) && line.chars().all(|c| c == '-') {
        return Line::Separator;
    }

    let severity_re = SEVERITY_RE.get_or_init(|| {
        Regex::new(r"^Severity:\s*(\S+)\s+Confidence:\s*(\S+)").expect("Invalid severity regex")
    });
    if let Some(caps) = severity_re.captures(line) {
        if let (Some(severity), Some(confidence)) = (caps.get(1), caps.get(2)) {
            return Line::SeverityConfidence {
                severity: severity.as_str(),
                confidence: confidence.as_str(),
            };
        }
    }

    let cwe_re = CWE_RE
        .get_or_init(|| Regex::new(r"^CWE:\s*(\S+)\s*\(([^)]*)\)").expect("Invalid CWE regex"));
    if let Some(caps) = cwe_re.captures(line) {
        if let (Some(id), Some(url)) = (caps.get(1), caps.get(2)) {
            return Line::Cwe {
                id: id.as_str(),
                url: url.as_str().trim(),
            };
        }
    }

    if let Some(rest) = line.strip_prefix("More Info:") {
        return Line::MoreInfo(rest.trim());
    }

    if let Some(rest) = line.strip_prefix("Location:") {
        let location = rest.trim();
        let location_re = LOCATION_RE.get_or_init(|| {
            Regex::new(r":(\d+)(?::\d+)?$").expect("Invalid location regex")
        });
        let line_number = location_re
            .captures(location)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());
        return Line::Location {
            location,
            line: line_number,
        };
    }

    Line::Other
}

/// Extracts lines `line - radius ..= line + radius` (1-based, clamped) from `source`
pub fn extract_snippet(source: &str, line: usize, radius: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    if line == 0 || line > lines.len() {
        return String::new();
    }
    let start = line.saturating_sub(radius).max(1);
    let end = (line + radius).min(lines.len());
    lines[start - 1..end].join("\n")
}

/// Lazy stream of findings over report lines
///
/// Each finding is emitted as soon as its block is complete: on the separator that
/// closes it, on the next issue header, on the end-of-report marker, or at the end
/// of input.
pub struct FindingStream<'s, I> {
    lines: I,
    source: &'s str,
    snippet_radius: usize,
    state: ParserState,
}

impl<'s, I, L> FindingStream<'s, I>
where
    I: Iterator<Item = L>,
    L: AsRef<str>,
{
    pub fn new(lines: I, source: &'s str, snippet_radius: usize) -> Self {
        Self {
            lines,
            source,
            snippet_radius,
            state: ParserState::AwaitingIssue,
        }
    }

    fn complete(&self, mut finding: Finding) -> Finding {
        if let Some(line) = finding.line_number {
            finding.code_snippet = extract_snippet(self.source, line, self.snippet_radius);
        }
        finding
    }
}

impl<'s, I, L> Iterator for FindingStream<'s, I>
where
    I: Iterator<Item = L>,
    L: AsRef<str>,
{
    type Item = Finding;

    fn next(&mut self) -> Option<Finding> {
        loop {
            if matches!(self.state, ParserState::Done) {
                return None;
            }

            let Some(raw) = self.lines.next() else {
                return match std::mem::replace(&mut self.state, ParserState::Done) {
                    ParserState::InIssue(finding) => Some(self.complete(finding)),
                    _ => None,
                };
            };

            let state = std::mem::replace(&mut self.state, ParserState::Done);
            match (state, classify(raw.as_ref())) {
                (ParserState::AwaitingIssue, Line::IssueHeader(issue)) => {
                    self.state = ParserState::InIssue(Finding::new(issue));
                }
                (ParserState::AwaitingIssue, Line::EndOfReport) => {
                    self.state = ParserState::Done;
                }
                (ParserState::AwaitingIssue, _) => {
                    self.state = ParserState::AwaitingIssue;
                }
                (ParserState::InIssue(finding), Line::IssueHeader(issue)) => {
                    self.state = ParserState::InIssue(Finding::new(issue));
                    return Some(self.complete(finding));
                }
                (ParserState::InIssue(finding), Line::Separator) => {
                    self.state = ParserState::AwaitingIssue;
                    return Some(self.complete(finding));
                }
                (ParserState::InIssue(finding), Line::EndOfReport) => {
                    self.state = ParserState::Done;
                    return Some(self.complete(finding));
                }
                (ParserState::InIssue(mut finding), field) => {
                    match field {
                        Line::SeverityConfidence {
                            severity,
                            confidence,
                        } => {
                            finding.severity = severity.to_string();
                            finding.confidence = confidence.to_string();
                        }
                        Line::Cwe { id, url } => {
                            finding.cwe = id.to_string();
                            finding.cwe_url = url.to_string();
                        }
                        Line::MoreInfo(url) => finding.more_info = url.to_string(),
                        Line::Location { location, line } => {
                            finding.location = location.to_string();
                            finding.line_number = line;
                        }
                        _ => {}
                    }
                    self.state = ParserState::InIssue(finding);
                }
                (ParserState::Done, _) => return None,
            }
        }
    }
}

/// Parses a complete report into findings
pub fn parse_report(report: &str, source: &str, snippet_radius: usize) -> Vec<Finding> {
    FindingStream::new(report.lines(), source, snippet_radius).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "import subprocess\n\
                          import pickle\n\
                          \n\
                          def run(cmd):\n\
                          \x20   subprocess.call(cmd, shell=True)\n\
                          \n\
                          def load(data):\n\
                          \x20   return pickle.loads(data)\n";

    const REPORT: &str = r#"Run started:2024-09-28 10:00:00.000000

Test results:
>> Issue: [B602:subprocess_popen_with_shell_equals_true] subprocess call with shell=True identified, security issue.
   Severity: High   Confidence: High
   CWE: CWE-78 (https://cwe.mitre.org/data/definitions/78.html)
   More Info: https://bandit.readthedocs.io/en/1.7.9/plugins/b602_subprocess_popen_with_shell_equals_true.html
   Location: ./app.py:5:4
4	def run(cmd):
5	    subprocess.call(cmd, shell=True)
6

--------------------------------------------------
>> Issue: [B301:blacklist] Pickle and modules that wrap it can be unsafe when used to deserialize untrusted data, possible security issue.
   Severity: Medium   Confidence: High
   CWE: CWE-502 (https://cwe.mitre.org/data/definitions/502.html)
   More Info: https://bandit.readthedocs.io/en/1.7.9/blacklists/blacklist_calls.html#b301-pickle
   Location: ./app.py:8:11
7	def load(data):
8	    return pickle.loads(data)

--------------------------------------------------

Code scanned:
	Total lines of code: 6
	Total lines skipped (#nosec): 0
"#;

    #[test]
    fn test_parses_two_issues() {
        let findings = parse_report(REPORT, SOURCE, 1);
        assert_eq!(findings.len(), 2);

        let first = &findings[0];
        assert!(first.issue.starts_with("[B602:subprocess_popen_with_shell_equals_true]"));
        assert_eq!(first.severity, "High");
        assert_eq!(first.confidence, "High");
        assert_eq!(first.cwe, "CWE-78");
        assert_eq!(first.cwe_url, "https://cwe.mitre.org/data/definitions/78.html");
        assert!(first.more_info.ends_with("b602_subprocess_popen_with_shell_equals_true.html"));
        assert_eq!(first.location, "./app.py:5:4");
        assert_eq!(first.line_number, Some(5));
        assert_eq!(
            first.code_snippet,
            "def run(cmd):\n    subprocess.call(cmd, shell=True)\n"
        );

        let second = &findings[1];
        assert_eq!(second.severity, "Medium");
        assert_eq!(second.cwe, "CWE-502");
        assert_eq!(second.line_number, Some(8));
        assert_eq!(second.code_snippet, "def load(data):\n    return pickle.loads(data)");
    }

    #[test]
    fn test_no_issues_is_empty() {
        let report = "Run started:2024\n\nTest results:\n\tNo issues identified.\n\nCode scanned:\n\tTotal lines of code: 3\n";
        assert!(parse_report(report, SOURCE, 3).is_empty());
    }

    #[test]
    fn test_header_flushes_previous_issue() {
        let report = ">> Issue: [B101:assert_used] Use of assert detected.\n   Location: ./a.py:1:0\n>> Issue: [B105:hardcoded_password_string] Possible hardcoded password\n   Location: ./a.py:2:0\n";
        let findings = parse_report(report, "assert x\npassword = 'x'\n", 0);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].code_snippet, "assert x");
        assert_eq!(findings[1].code_snippet, "password = 'x'");
    }

    #[test]
    fn test_lines_after_end_marker_are_ignored() {
        let report = "Code scanned:\n>> Issue: [B101:assert_used] late\n";
        assert!(parse_report(report, "", 3).is_empty());
    }

    #[test]
    fn test_stream_is_lazy() {
        let mut stream = FindingStream::new(REPORT.lines(), SOURCE, 0);
        let first = stream.next().unwrap();
        assert_eq!(first.line_number, Some(5));
        let second = stream.next().unwrap();
        assert_eq!(second.line_number, Some(8));
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_snippet_clamps_to_bounds() {
        let source = "a\nb\nc";
        assert_eq!(extract_snippet(source, 1, 5), "a\nb\nc");
        assert_eq!(extract_snippet(source, 3, 1), "b\nc");
        assert_eq!(extract_snippet(source, 2, 0), "b");
        assert_eq!(extract_snippet(source, 0, 2), "");
        assert_eq!(extract_snippet(source, 9, 2), "");
    }

    #[test]
    fn test_classify_location_without_column() {
        assert_eq!(
            classify("   Location: src/app.py:42"),
            Line::Location {
                location: "src/app.py:42",
                line: Some(42)
            }
        );
    }
}
