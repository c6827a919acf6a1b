//! Reference extraction over realistic TypeScript/JavaScript files

use move_imports::{IndexConfig, Position, ReferenceExtractor};

fn extractor() -> ReferenceExtractor {
    ReferenceExtractor::new(IndexConfig::default().expression_references)
}

fn paths(code: &str) -> Vec<String> {
    extractor().extract(code).into_iter().map(|r| r.path).collect()
}

#[test]
fn test_extraction_is_deterministic() {
    let code = r#"
import a from "./a";
import { b } from "../shared/b";
const c = require("./c");
export * from "./d";
"#;
    let first = extractor().extract(code);
    let second = extractor().extract(code);
    assert_eq!(first, second);
    assert_eq!(
        first.iter().map(|r| r.path.as_str()).collect::<Vec<_>>(),
        vec!["./a", "../shared/b", "./c", "./d"]
    );
}

#[test]
fn test_jest_module_helpers() {
    let code = r#"
jest.mock("./api");
jest.setMock("./store", {});
jest.unmock("./real");
jest.genMockFromModule("./auto");
jest.doMock("./ignored");
"#;
    assert_eq!(paths(code), vec!["./api", "./store", "./real", "./auto"]);
}

#[test]
fn test_react_component_file() {
    let code = r#"import React, { useState } from 'react';
import styles from './Button.module.css';
import { Icon } from '../icons';

interface Props {
    label: string;
}

export function Button({ label }: Props) {
    const [pressed, setPressed] = useState(false);
    return <button className={styles.root} onClick={() => setPressed(!pressed)}><Icon />{label}</button>;
}
"#;
    let refs = extractor().extract(code);
    let found: Vec<_> = refs.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(found, vec!["react", "./Button.module.css", "../icons"]);

    let css = &refs[1];
    assert_eq!(css.start, Position::new(1, 19));
    assert_eq!(css.end, Position::new(1, 40));
    assert!(css.is_relative());
    assert!(!refs[0].is_relative());
}

#[test]
fn test_reexports_and_side_effect_imports() {
    let code = r#"
import "./polyfills";
export * from "./types";
export { a, b as c } from "./impl";
export const local = 1;
"#;
    assert_eq!(paths(code), vec!["./polyfills", "./types", "./impl"]);
}

#[test]
fn test_multiline_positions() {
    let code = "import {\n    a,\n    b,\n} from \"./ab\";\n";
    let refs = extractor().extract(code);
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].start, Position::new(3, 7));
    assert_eq!(refs[0].end, Position::new(3, 13));
}

#[test]
fn test_bare_specifiers_are_extracted_but_not_relative() {
    let extractor = ReferenceExtractor::new(vec!["require".to_string()]);
    let refs = extractor.extract(r#"import a from "./a"; const b = require("./b"); require("pkg");"#);

    let raw: Vec<_> = refs.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(raw, vec!["./a", "./b", "pkg"]);

    let relative: Vec<_> = refs.iter().filter(|r| r.is_relative()).map(|r| r.path.as_str()).collect();
    assert_eq!(relative, vec!["./a", "./b"]);
}
