use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::error::MemoryResult;
use crate::memory::{FragmentationReport, PhysicalMemory};
use crate::mmu::{AccessEvent, Mmu};
use crate::swap::BackingStore;

/// One line of a trace file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Read(usize),
    Write(usize, Vec<u8>),
    SwapOut(usize),
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read trace file: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Parsed trace file: the operations to replay against the MMU, in order.
#[derive(Debug, Default)]
pub struct Trace {
    pub operations: Vec<Operation>,
}

impl Trace {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TraceError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse `read <addr>`, `write <addr> <text...>` and `swap-out <page>`
    /// lines (or `r`, `w`, `o`). Blank lines and `#` comments are skipped.
    ///
    /// A write payload runs to the end of the line, so `#` inside it is data.
    pub fn parse(content: &str) -> Result<Self, TraceError> {
        let mut operations = Vec::new();

        for (index, raw) in content.lines().enumerate() {
            let line = index + 1;
            let err = |message: String| TraceError::Parse { line, message };

            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }

            let (command, rest) = match text.split_once(char::is_whitespace) {
                Some((command, rest)) => (command, rest.trim()),
                None => (text, ""),
            };
            let operand = strip_comment(rest);

            let op = match command {
                "read" | "r" => Operation::Read(parse_number(operand).map_err(err)?),
                "write" | "w" => {
                    let (addr, payload) = rest
                        .split_once(char::is_whitespace)
                        .ok_or_else(|| err(format!("write needs an address and data: {}", text)))?;
                    let address = parse_number(addr).map_err(err)?;
                    Operation::Write(address, payload.trim().as_bytes().to_vec())
                }
                "swap-out" | "o" => Operation::SwapOut(parse_number(operand).map_err(err)?),
                other => return Err(err(format!("unknown operation: {}", other))),
            };
            operations.push(op);
        }

        Ok(Trace { operations })
    }

    /// Replay every operation, collecting the bytes returned by reads.
    ///
    /// Stops at the first failing operation.
    pub fn run<B: BackingStore>(&self, mmu: &mut Mmu<B>) -> MemoryResult<Vec<u8>> {
        let mut reads = Vec::new();
        for op in &self.operations {
            match op {
                Operation::Read(address) => reads.push(mmu.read(*address)?),
                Operation::Write(address, data) => mmu.write(*address, data)?,
                Operation::SwapOut(page) => mmu.swap_out(*page)?,
            }
        }
        Ok(reads)
    }
}

fn strip_comment(text: &str) -> &str {
    text.split('#').next().unwrap_or("").trim()
}

/// Parse a decimal, `0x` hexadecimal or `0b` binary number
pub fn parse_number(token: &str) -> Result<usize, String> {
    let token = token.trim();
    let parsed = if let Some(hex) = token.strip_prefix("0x") {
        usize::from_str_radix(hex, 16)
    } else if let Some(bin) = token.strip_prefix("0b") {
        usize::from_str_radix(bin, 2)
    } else {
        token.parse()
    };
    parsed.map_err(|_| format!("invalid number: {:?}", token))
}

pub fn write_results<P: AsRef<Path>>(path: P, results: &[u8]) -> std::io::Result<()> {
    let output: Vec<String> = results.iter().map(|r| r.to_string()).collect();
    fs::write(path.as_ref(), output.join(" "))
}

/// Per-page "Allocated"/"Free" table, judged by each page's first byte
pub fn render_memory_table(memory: &PhysicalMemory) -> String {
    let mut out = String::from("Memory Table:\n--------------\n");
    for page in 0..memory.config().page_count() {
        let state = if memory.is_page_allocated(page) { "Allocated" } else { "Free" };
        let _ = writeln!(out, "Page {}: {}", page, state);
    }
    out.push_str("--------------\n");
    out
}

pub fn render_access_log(log: &[AccessEvent]) -> String {
    let mut out = String::from("Access Log:\n--------------\n");
    for event in log {
        let _ = writeln!(out, "{}", event);
    }
    out.push_str("--------------\n");
    out
}

pub fn render_fragmentation(report: &FragmentationReport) -> String {
    if report.fragmented {
        format!(
            "Physical memory is fragmented.\nFragmented pages: {:?}\n",
            report.pages
        )
    } else {
        String::from("Physical memory is not fragmented.\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfig;
    use crate::swap::MemoryDisk;

    fn setup_mmu() -> Mmu<MemoryDisk> {
        let config = MemoryConfig::new(256, 512, 64).unwrap();
        Mmu::new(PhysicalMemory::new(config), MemoryDisk::new(&config)).unwrap()
    }

    #[test]
    fn test_parse_number_radixes() {
        assert_eq!(parse_number("42"), Ok(42));
        assert_eq!(parse_number("0x40"), Ok(64));
        assert_eq!(parse_number("0b101"), Ok(5));
        assert!(parse_number("0xZZ").is_err());
        assert!(parse_number("-1").is_err());
    }

    #[test]
    fn test_parse_trace() {
        let content = "# setup\nw 0 hello world\n\nread 0x4   # trailing comment\nswap-out 0\nr 0b100\n";
        let trace = Trace::parse(content).unwrap();
        assert_eq!(
            trace.operations,
            vec![
                Operation::Write(0, b"hello world".to_vec()),
                Operation::Read(4),
                Operation::SwapOut(0),
                Operation::Read(4),
            ]
        );
    }

    #[test]
    fn test_parse_trace_write_payload_keeps_hash() {
        let trace = Trace::parse("w 0 issue #5\nwrite 0x10 a # b\nr 1 # not data").unwrap();
        assert_eq!(
            trace.operations,
            vec![
                Operation::Write(0, b"issue #5".to_vec()),
                Operation::Write(16, b"a # b".to_vec()),
                Operation::Read(1),
            ]
        );

        let mut mmu = setup_mmu();
        trace.run(&mut mmu).unwrap();
        assert_eq!(mmu.read(6).unwrap(), b'#');
        assert_eq!(mmu.read(7).unwrap(), b'5');
    }

    #[test]
    fn test_parse_trace_errors_name_line() {
        let err = Trace::parse("r 1\njump 3\n").unwrap_err();
        match err {
            TraceError::Parse { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("jump"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }

        assert!(matches!(Trace::parse("w 12"), Err(TraceError::Parse { line: 1, .. })));
        assert!(matches!(Trace::parse("r"), Err(TraceError::Parse { line: 1, .. })));
    }

    #[test]
    fn test_trace_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(Trace::from_file(dir.path().join("nope.txt")), Err(TraceError::Io(_))));
    }

    #[test]
    fn test_run_trace() {
        let mut mmu = setup_mmu();
        let trace = Trace::parse("w 64 ABC\no 1\nr 64\nr 65\nr 66\nr 0").unwrap();
        let reads = trace.run(&mut mmu).unwrap();
        assert_eq!(reads, vec![0x41, 0x42, 0x43, 0]);
    }

    #[test]
    fn test_run_trace_stops_on_error() {
        let mut mmu = setup_mmu();
        let trace = Trace::parse("r 0\nr 9999\nr 1").unwrap();
        assert!(trace.run(&mut mmu).unwrap_err().is_out_of_range());
        assert_eq!(mmu.access_log().len(), 2);
    }

    #[test]
    fn test_write_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_results(&path, &[65, 0, 255]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "65 0 255");
    }

    #[test]
    fn test_render_memory_table() {
        let mut mmu = setup_mmu();
        mmu.write(128, b"x").unwrap();
        let table = render_memory_table(mmu.memory());

        assert!(table.starts_with("Memory Table:\n"));
        assert!(table.contains("Page 0: Free\n"));
        assert!(table.contains("Page 2: Allocated\n"));
        assert!(table.contains("Page 7: Free\n"));
        assert_eq!(table.lines().filter(|l| l.starts_with("Page ")).count(), 8);
    }

    #[test]
    fn test_render_access_log() {
        let mut mmu = setup_mmu();
        mmu.read(3).unwrap();
        let text = render_access_log(mmu.access_log());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Access Log:",
                "--------------",
                "Swap in virtual page 0",
                "Read virtual address 3: Physical page 0 (from swap)",
                "--------------",
            ]
        );
    }

    #[test]
    fn test_render_fragmentation() {
        let clean = FragmentationReport::default();
        assert_eq!(render_fragmentation(&clean), "Physical memory is not fragmented.\n");

        let report = FragmentationReport { fragmented: true, pages: vec![3, 5] };
        assert!(render_fragmentation(&report).contains("[3, 5]"));
    }
}
