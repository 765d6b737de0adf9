use woofnb::error::ExecErrorName;
use woofnb::header::IoPolicy;
use woofnb::model::{CellType, SideFx};
use woofnb::parser;
use woofnb::policy;

#[test]
fn a_bash_cell_is_denied_without_allow_shell_even_if_sidefx_is_isolated() {
    let src = "%WOOFNB 1.0\nname: demo\nlanguage: python\n```cell id=a type=bash sidefx=isolated\necho hi\n```\n";
    let notebook = parser::parse(src).unwrap();
    let cell = notebook.cell("a").unwrap();
    assert_eq!(cell.cell_type, CellType::Bash);
    assert_eq!(cell.sidefx, SideFx::Isolated);

    let denied = IoPolicy::default();
    let (name, _) = policy::check(cell, &denied).unwrap_err();
    assert_eq!(name, ExecErrorName::PolicyDenied);

    let granted = IoPolicy { allow_shell: true, ..IoPolicy::default() };
    assert!(policy::check(cell, &granted).is_ok());
}

#[test]
fn allow_shell_alone_is_sufficient_for_an_fs_sidefx_cell() {
    let src = "%WOOFNB 1.0\nname: demo\nlanguage: python\n```cell id=a type=code sidefx=fs\nopen('x')\n```\n";
    let notebook = parser::parse(src).unwrap();
    let cell = notebook.cell("a").unwrap();

    let policy = IoPolicy { allow_shell: true, ..IoPolicy::default() };
    assert!(policy::check(cell, &policy).is_ok());
}

#[test]
fn net_sidefx_is_independent_of_allow_shell() {
    let src = "%WOOFNB 1.0\nname: demo\nlanguage: python\n```cell id=a type=code sidefx=net\nfetch()\n```\n";
    let notebook = parser::parse(src).unwrap();
    let cell = notebook.cell("a").unwrap();

    let policy = IoPolicy { allow_shell: true, allow_files: true, allow_network: false };
    let (name, _) = policy::check(cell, &policy).unwrap_err();
    assert_eq!(name, ExecErrorName::PolicyDenied);
}
