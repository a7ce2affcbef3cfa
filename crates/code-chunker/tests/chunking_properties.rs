use pretty_assertions::assert_eq;
use sift_code_chunker::{
    Chunker, ChunkerConfig, FileAnalysis, GeneratedKind, SignalCatalog, SignalKind, SourceFile,
    StructuralUnit,
};

fn chunker() -> Chunker {
    Chunker::with_defaults().expect("default chunker")
}

fn tight_chunker() -> Chunker {
    let config = ChunkerConfig {
        target_chunk_bytes: 64,
        max_chunk_bytes: 128,
        long_line_threshold_bytes: 100,
        ..ChunkerConfig::default()
    };
    Chunker::new(config, &SignalCatalog::builtin()).expect("tight chunker")
}

fn assert_total_partition(analysis: &FileAnalysis, len: usize) {
    let mut cursor = 0;
    for (idx, chunk) in analysis.chunks.iter().enumerate() {
        assert_eq!(chunk.sequence_index, idx, "{}", analysis.path);
        assert_eq!(chunk.span.start, cursor, "{}: gap or overlap", analysis.path);
        assert!(chunk.span.end > chunk.span.start, "{}: empty chunk", analysis.path);
        cursor = chunk.span.end;
    }
    assert_eq!(cursor, len, "{}: partition does not reach EOF", analysis.path);
}

/// Outermost generated units must each sit inside exactly one chunk of their kind
fn assert_generated_atomic(analysis: &FileAnalysis, unit: &StructuralUnit) {
    let classification = &analysis.classifications[unit.id.0];
    if !classification.is_generated() {
        for child in &unit.children {
            assert_generated_atomic(analysis, child);
        }
        return;
    }
    let holders: Vec<_> = analysis
        .chunks
        .iter()
        .filter(|c| c.span.start < unit.span.end && unit.span.start < c.span.end)
        .collect();
    assert_eq!(holders.len(), 1, "{}: generated unit split", analysis.path);
    assert!(holders[0].span.contains(&unit.span));
    assert_eq!(holders[0].classification.kind, classification.kind);
}

fn corpus() -> Vec<(&'static str, &'static str, String)> {
    let mut files = vec![
        ("partition.rs", "rust", include_str!("../src/partition.rs").to_string()),
        ("signals.rs", "rust", include_str!("../src/signals.rs").to_string()),
        ("braces.rs", "rust", include_str!("../src/boundary/braces.rs").to_string()),
        (
            "long_line_config.php",
            "php",
            include_str!("fixtures/long_line_config.php").to_string(),
        ),
        (
            "mysql_interceptor.php",
            "php",
            include_str!("fixtures/generated/mysql_interceptor.php").to_string(),
        ),
        (
            "product_option_extension.php",
            "php",
            include_str!("fixtures/generated/product_option_extension.php").to_string(),
        ),
        ("unbalanced.js", "javascript", "}}} function a() { if (x) { y(); \n".to_string()),
        ("only_newlines.py", "python", "\n\n\n\n".to_string()),
        ("no_trailing_newline.go", "go", "package main\n\nfunc main() {}".to_string()),
        (
            "crlf.cs",
            "csharp",
            "class A\r\n{\r\n    void B()\r\n    {\r\n    }\r\n}\r\n".to_string(),
        ),
        (
            "odd_indent.py",
            "python",
            "class A:\n  def b(self):\n        return 1\n   x = 2\n\tdef c(self):\n pass\n".to_string(),
        ),
        (
            "blocks.rb",
            "ruby",
            "module M\n  class A\n    def b\n      [1].each do |x|\n        puts x\n      end\n    end\n  end\nend\n"
                .to_string(),
        ),
        (
            "unterminated.php",
            "php",
            "<?php\n$a = 'never closed;\nfunction f() {\n /* open comment\n".to_string(),
        ),
        ("unknown.txt", "", "just some prose {with braces}\nand more ) ( }\n".to_string()),
        ("single_byte.c", "c", "x".to_string()),
    ];
    files.push(("minified.js", "javascript", {
        let mut blob = String::from("(function(){");
        for i in 0..400 {
            blob.push_str(&format!("var a{i}=function(b){{return b+{i}}};"));
        }
        blob.push_str("})();\nconsole.log(1);\n");
        blob
    }));
    files
}

#[test]
fn every_input_is_partitioned_exactly() {
    for engine in [chunker(), tight_chunker()] {
        for (path, tag, code) in corpus() {
            let analysis = engine.chunk(&SourceFile::new(path, tag, code.as_str()));
            assert_total_partition(&analysis, code.len());
        }
    }
}

#[test]
fn generated_units_are_never_split_or_merged() {
    for engine in [chunker(), tight_chunker()] {
        for (path, tag, code) in corpus() {
            let analysis = engine.chunk(&SourceFile::new(path, tag, code.as_str()));
            assert_generated_atomic(&analysis, &analysis.structure.root);
        }
    }
}

#[test]
fn repeated_runs_are_identical() {
    let first = chunker();
    let second = chunker();
    for (path, tag, code) in corpus() {
        let file = SourceFile::new(path, tag, code.as_str());
        let a = first.chunk(&file);
        let b = second.chunk(&file);
        assert_eq!(a.descriptors(), b.descriptors(), "{path}");
        assert_eq!(a.classifications, b.classifications, "{path}");
        assert_eq!(a.signals, b.signals, "{path}");
        assert_eq!(a.chunks, first.chunk(&file).chunks, "{path}");
    }
}

#[test]
fn short_data_class_is_one_plain_chunk() {
    let mut code = String::from("<?php\nnamespace Acme\\Shipping\\Model;\n\nclass Address\n{\n");
    for field in ["street", "city", "zip", "country"] {
        code.push_str(&format!("    /** @var string */\n    private ${field};\n\n"));
    }
    for field in ["street", "city", "zip", "country"] {
        code.push_str(&format!(
            "    public function get{}()\n    {{\n        return $this->{field};\n    }}\n\n",
            field[..1].to_uppercase() + &field[1..]
        ));
    }
    code.push_str("}\n");
    assert!(code.lines().count() >= 35);

    let analysis = chunker().chunk(&SourceFile::new("Address.php", "php", code.as_str()));

    assert_eq!(analysis.chunks.len(), 1);
    assert_eq!(analysis.chunks[0].classification.kind, GeneratedKind::None);
    assert_eq!(analysis.file_classification.kind, GeneratedKind::None);
}

#[test]
fn marked_interceptor_with_delegating_methods_is_one_generated_chunk() {
    let mut code = String::from(
        "<?php\nnamespace Acme\\Sales\\Model\\Order;\n\n/**\n * Interceptor class for @see \\Acme\\Sales\\Model\\Order\n */\nclass Interceptor extends \\Acme\\Sales\\Model\\Order implements \\Magento\\Framework\\Interception\\InterceptorInterface\n{\n    use \\Magento\\Framework\\Interception\\Interceptor;\n",
    );
    for i in 0..10 {
        code.push_str(&format!(
            "\n    /**\n     * {{@inheritdoc}}\n     */\n    public function method{i}($value)\n    {{\n        $pluginInfo = $this->pluginList->getNext($this->subjectType, 'method{i}');\n        return $pluginInfo ? $this->___callPlugins('method{i}', func_get_args(), $pluginInfo) : parent::method{i}($value);\n    }}\n"
        ));
    }
    code.push_str("}\n");

    let analysis = chunker().chunk(&SourceFile::new("Order/Interceptor.php", "php", code.as_str()));

    assert_eq!(analysis.chunks.len(), 1);
    let chunk = &analysis.chunks[0];
    assert_eq!(chunk.classification.kind, GeneratedKind::Interceptor);
    assert!(chunk.classification.confidence >= 0.5);
    let delegations = analysis
        .signals
        .iter()
        .filter(|s| s.kind == SignalKind::DelegationIdiom)
        .count();
    assert_eq!(delegations, 10);
    assert!(analysis.deviations.is_empty(), "{:?}", analysis.deviations);
}

#[test]
fn long_line_is_isolated_with_outlier_signal() {
    let long_line = format!("const payload = \"{}\";", "x".repeat(700));
    assert!(long_line.len() >= 700);
    let code = format!(
        "const a = 1;\nconst b = 2;\nfunction f() {{\n  return a + b;\n}}\n{long_line}\nconst c = 3;\nconsole.log(c);\n"
    );
    let start = code.find(&long_line).unwrap();
    let end = start + long_line.len() + 1;

    let analysis = chunker().chunk(&SourceFile::new("blob.js", "javascript", code.as_str()));

    assert_total_partition(&analysis, code.len());
    let isolated: Vec<_> = analysis
        .chunks
        .iter()
        .filter(|c| c.span.range() == (start..end))
        .collect();
    assert_eq!(isolated.len(), 1);
    assert!(analysis
        .signals
        .iter()
        .any(|s| s.kind == SignalKind::LongLineOutlier && s.location.start == start));
    assert_eq!(isolated[0].classification.kind, GeneratedKind::None);
}

#[test]
fn long_line_inside_class_is_isolated() {
    let code = include_str!("fixtures/long_line_config.php");
    let line = code
        .lines()
        .find(|l| l.contains("private $defaults"))
        .unwrap();
    let start = code.find(line).unwrap();

    let analysis = chunker().chunk(&SourceFile::new("ProductConfig.php", "php", code));

    assert_total_partition(&analysis, code.len());
    let chunk = analysis
        .chunks
        .iter()
        .find(|c| c.span.start == start)
        .expect("long line starts a chunk");
    assert_eq!(chunk.span.end, start + line.len() + 1);
    assert!(analysis.chunks.len() >= 3);
}

#[test]
fn proxy_marker_and_suffix_classify_as_proxy() {
    let code = "<?php\n/**\n * Proxy class for @see \\Acme\\Catalog\\Model\\Product\n */\nclass ProductProxy extends \\Acme\\Catalog\\Model\\Product\n{\n    public function getSku()\n    {\n        return $this->_getSubject()->getSku();\n    }\n}\n";
    let analysis = chunker().chunk(&SourceFile::new("ProductProxy.php", "php", code));

    let generated: Vec<_> = analysis
        .chunks
        .iter()
        .filter(|c| c.classification.is_generated())
        .collect();
    assert_eq!(generated.len(), 1);
    assert_eq!(generated[0].classification.kind, GeneratedKind::Proxy);
    assert!(generated[0].classification.confidence >= 0.5);
}

#[test]
fn large_plain_class_is_not_generated() {
    let mut code = String::from("<?php\nclass Inventory\n{\n");
    for i in 0..400 {
        code.push_str(&format!("    private $slot{i} = {i};\n"));
    }
    code.push_str("}\n");

    let analysis = chunker().chunk(&SourceFile::new("Inventory.php", "php", code.as_str()));

    assert_total_partition(&analysis, code.len());
    assert!(analysis.chunks.iter().all(|c| !c.classification.is_generated()));
    assert_eq!(analysis.file_classification.kind, GeneratedKind::None);
}

#[test]
fn size_outliers_alone_never_classify() {
    let mut code = String::new();
    for i in 0..5 {
        code.push_str(&format!("def f{i}():\n    return {i}\n\n"));
    }
    code.push_str("TEMPLATE = \"\"\"\n");
    for i in 0..120 {
        code.push_str(&format!("line {i} of a large embedded template\n"));
    }
    code.push_str("\"\"\"\n");

    let analysis = chunker().chunk(&SourceFile::new("templates.py", "python", code.as_str()));

    assert!(analysis
        .signals
        .iter()
        .any(|s| s.kind == SignalKind::SizeOutlier));
    assert_eq!(analysis.file_classification.kind, GeneratedKind::None);
    assert!(analysis
        .classifications
        .iter()
        .all(|c| !c.is_generated()));
    assert_total_partition(&analysis, code.len());
}

#[test]
fn shared_chunker_matches_sequential_results() {
    let chunker = chunker();
    let files: Vec<SourceFile> = corpus()
        .into_iter()
        .map(|(path, tag, code)| SourceFile::new(path, tag, code))
        .collect();
    let sequential: Vec<_> = files.iter().map(|f| chunker.chunk(f).descriptors()).collect();

    let parallel: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = files
            .iter()
            .map(|file| {
                let chunker = &chunker;
                scope.spawn(move || chunker.chunk(file).descriptors())
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker panicked"))
            .collect()
    });

    assert_eq!(sequential, parallel);
}

#[test]
fn catalog_extensions_add_new_fingerprints() {
    let mut catalog = SignalCatalog::builtin();
    catalog.extend(
        SignalCatalog::from_toml_str(
            r#"
[[doc_markers]]
phrase = "Generated by Acme Builder"
kind = "other"
weight = 0.6
"#,
        )
        .unwrap(),
    );
    let chunker = Chunker::new(ChunkerConfig::default(), &catalog).unwrap();
    let code = "// Generated by Acme Builder\nclass Widget {\n  build() { return 1; }\n}\n";

    let analysis = chunker.chunk(&SourceFile::new("widget.ts", "typescript", code));

    assert_eq!(analysis.chunks.len(), 1);
    assert_eq!(analysis.chunks[0].classification.kind, GeneratedKind::Other);
}

#[test]
fn malformed_catalogs_and_configs_fail_at_construction() {
    let bad_regex = SignalCatalog::from_toml_str(
        r#"
[[delegation_idioms]]
pattern = "return ($this"
"#,
    )
    .unwrap();
    let none_kind = SignalCatalog::from_toml_str(
        r#"
[[naming_suffixes]]
suffix = "Builder"
kind = "none"
weight = 0.3
"#,
    )
    .unwrap();
    let negative_weight = SignalCatalog::from_toml_str(
        r#"
[[doc_markers]]
phrase = "Builder class for"
kind = "other"
weight = -1.0
"#,
    )
    .unwrap();

    for catalog in [bad_regex, none_kind, negative_weight] {
        let err = Chunker::new(ChunkerConfig::default(), &catalog)
            .err()
            .expect("catalog should be rejected");
        assert!(err.is_configuration(), "{err}");
    }

    let inverted = ChunkerConfig {
        target_chunk_bytes: 5000,
        max_chunk_bytes: 1000,
        ..ChunkerConfig::default()
    };
    assert!(Chunker::new(inverted, &SignalCatalog::builtin()).is_err());
    assert!(ChunkerConfig::from_toml_str("target_chunk_bytes = \"big\"").is_err());
}

#[test]
fn invalid_utf8_degrades_to_one_opaque_chunk() {
    let mut bytes = b"<?php\nclass A {}\n".to_vec();
    bytes.extend_from_slice(&[0xc3, 0x28, b'\n']);
    let analysis = chunker().chunk(&SourceFile::new("broken.php", "php", bytes.clone()));

    assert_eq!(analysis.chunks.len(), 1);
    assert_eq!(analysis.chunks[0].span.range(), 0..bytes.len());
    assert_eq!(analysis.chunks[0].classification.kind, GeneratedKind::None);
    let error = analysis.input_error.expect("input error recorded");
    assert_eq!(error.valid_up_to, 17);
}
