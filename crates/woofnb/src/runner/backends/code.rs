//! `code`/`test` cell backend: spawns an external interpreter per cell body.
//! Sessions aren't shared interpreter processes here — each invocation is a
//! fresh process, the simplest design that satisfies the dispatch/timeout/
//! output-capture contract without depending on a real kernel protocol.

use std::io::Write;
use std::process::Command;
use std::time::Duration;

use super::{Backend, BackendResult};
use crate::model::{Cell, Output, StreamName};
use crate::runner::run_process;

/// Maps a notebook/cell language to the interpreter binary and the flag it
/// uses to run a literal program string.
fn interpreter_for(lang: &str) -> Option<(&'static str, &'static str)> {
    match lang {
        "python" | "python3" => Some(("python3", "-c")),
        "node" | "javascript" | "js" => Some(("node", "-e")),
        "ruby" => Some(("ruby", "-e")),
        "r" => Some(("Rscript", "-e")),
        _ => None,
    }
}

/// Printed ahead of the final expression's `repr`, so it can be split back
/// out of captured stdout into an `execute_result` output. A NUL-delimited
/// sentinel can't collide with anything a cell could print on purpose.
const RESULT_MARKER: &str = "\u{0}WOOFNB_RESULT\u{0}";

/// A Python wrapper that execs every top-level statement but the last, then,
/// if the last one is a bare expression, evaluates it and prints its `repr`
/// behind [`RESULT_MARKER`] — the same "last expression becomes the result"
/// behavior a real Python kernel gives a notebook cell, done here by parsing
/// the cell body with `ast` instead of depending on one.
const PYTHON_WRAPPER: &str = r"
import ast, sys
with open(sys.argv[1], 'r', encoding='utf-8') as f:
    src = f.read()
tree = ast.parse(src, mode='exec')
ns = {'__name__': '__main__'}
body = tree.body
if body:
    *head, last = body
    if head:
        exec(compile(ast.Module(body=head, type_ignores=[]), '<cell>', 'exec'), ns)
    if isinstance(last, ast.Expr):
        value = eval(compile(ast.Expression(body=last.value), '<cell>', 'eval'), ns)
        if value is not None:
            sys.stdout.write('\x00WOOFNB_RESULT\x00' + repr(value) + '\n')
    else:
        exec(compile(ast.Module(body=[last], type_ignores=[]), '<cell>', 'exec'), ns)
";

pub struct CodeBackend;

impl Backend for CodeBackend {
    fn run(&self, cell: &Cell, lang: &str, timeout: Duration) -> BackendResult {
        let Some((bin, flag)) = interpreter_for(lang) else {
            return Err((
                crate::error::ExecErrorName::Runtime,
                format!("no interpreter registered for language `{lang}`"),
            ));
        };

        if matches!(lang, "python" | "python3") {
            return run_python_with_result_capture(bin, cell, timeout);
        }

        let mut cmd = Command::new(bin);
        cmd.arg(flag).arg(&cell.body);
        run_process(cmd, timeout)
    }
}

/// Runs a Python cell through [`PYTHON_WRAPPER`] so its final expression (if
/// any) surfaces as an `execute_result`, not just stdout text. Falls back to
/// a plain `-c` invocation if the wrapper can't be staged on disk — a
/// missing `execute_result` is a smaller loss than a cell that can't run at
/// all because a temp directory is unwritable.
fn run_python_with_result_capture(bin: &str, cell: &Cell, timeout: Duration) -> BackendResult {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(_) => {
            let mut cmd = Command::new(bin);
            cmd.arg("-c").arg(&cell.body);
            return run_process(cmd, timeout);
        }
    };

    let wrapper_path = dir.path().join("wrapper.py");
    let body_path = dir.path().join("cell.py");
    if write_file(&wrapper_path, PYTHON_WRAPPER).is_err() || write_file(&body_path, &cell.body).is_err() {
        let mut cmd = Command::new(bin);
        cmd.arg("-c").arg(&cell.body);
        return run_process(cmd, timeout);
    }

    let mut cmd = Command::new(bin);
    cmd.arg(&wrapper_path).arg(&body_path);
    let outputs = run_process(cmd, timeout)?;
    Ok(split_execute_result(outputs))
}

fn write_file(path: &std::path::Path, contents: &str) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(contents.as_bytes())
}

/// Pulls [`RESULT_MARKER`] and the `repr` that follows it out of a captured
/// stdout stream, turning it into a trailing `execute_result` output and
/// leaving any text the cell printed before it as plain stdout.
fn split_execute_result(mut outputs: Vec<Output>) -> Vec<Output> {
    let mut repr = None;
    for output in &mut outputs {
        if let Output::Stream { name: StreamName::Stdout, text } = output {
            if let Some(pos) = text.find(RESULT_MARKER) {
                let before = text[..pos].to_string();
                repr = Some(text[pos + RESULT_MARKER.len()..].trim_end_matches('\n').to_string());
                *text = before;
            }
        }
    }
    outputs.retain(|o| !matches!(o, Output::Stream { name: StreamName::Stdout, text } if text.is_empty()));
    if let Some(repr) = repr {
        outputs.push(Output::ExecuteResult { repr });
    }
    outputs
}
