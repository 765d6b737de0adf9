use woofnb::error::LintCode;
use woofnb::parser;

#[test]
fn a_well_formed_pipeline_lints_clean() {
    let src = "%WOOFNB 1.0\n\
name: demo\n\
language: python\n\
io_policy:\n\
  allow_shell: true\n\
```cell id=load type=code\n\
x = 1\n\
```\n\
```cell id=check type=bash deps=load\n\
echo ok\n\
```\n";
    let notebook = parser::parse(src).unwrap();
    assert!(woofnb::linter::lint(&notebook).is_empty());
}

#[test]
fn cycles_spanning_three_cells_are_caught() {
    let src = "%WOOFNB 1.0\nname: demo\nlanguage: python\nexecution:\n  order: graph\n\
```cell id=a type=code deps=c\n1\n```\n\
```cell id=b type=code deps=a\n2\n```\n\
```cell id=c type=code deps=b\n3\n```\n";
    let notebook = parser::parse(src).unwrap();
    let diagnostics = woofnb::linter::lint(&notebook);
    assert!(diagnostics.iter().any(|d| d.code == LintCode::Cycle));
}

#[test]
fn dotted_id_is_valid() {
    let src = "%WOOFNB 1.0\nname: demo\nlanguage: python\n```cell id=a.b type=code\n1\n```\n";
    let notebook = parser::parse(src).unwrap();
    let diagnostics = woofnb::linter::lint(&notebook);
    assert!(!diagnostics.iter().any(|d| d.code == LintCode::BadCellId));
}

#[test]
fn invalid_id_characters_are_rejected() {
    let src = "%WOOFNB 1.0\nname: demo\nlanguage: python\n```cell id=a@b type=code\n1\n```\n";
    let notebook = parser::parse(src).unwrap();
    let diagnostics = woofnb::linter::lint(&notebook);
    assert!(diagnostics.iter().any(|d| d.code == LintCode::BadCellId));
}

#[test]
fn net_sidefx_without_allow_network_is_a_policy_conflict() {
    let src = "%WOOFNB 1.0\nname: demo\nlanguage: python\n```cell id=fetch type=code sidefx=net\nfetch()\n```\n";
    let notebook = parser::parse(src).unwrap();
    let diagnostics = woofnb::linter::lint(&notebook);
    assert!(diagnostics
        .iter()
        .any(|d| d.code == LintCode::PolicyConflict));
}
