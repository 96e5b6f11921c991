//! Compilation driver and pipeline orchestration

use crate::common::{CompileError, CompileResult};
use crate::frontend::{self, ast::Program};
use crate::graph::{Assembler, BytecodeGenerator, Module, NoBytecode};
use crate::sema::{AnalysisResult, Analyzer, GlobalResolver, MapResolver, SymbolKind};
use crate::types::Type;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Debug output toggles shared by every pipeline stage
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub dump_tokens: bool,
    pub dump_ast: bool,
    pub dump_symbols: bool,
}

/// Compilation pipeline that chains parsing, analysis and assembly
pub struct Pipeline {
    config: PipelineConfig,
    analyzer: Analyzer,
    generator: Box<dyn BytecodeGenerator>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            analyzer: Analyzer::new(),
            generator: Box::new(NoBytecode),
        }
    }

    /// Resolve names missing from the program through `resolver`
    pub fn with_resolver(mut self, resolver: Arc<dyn GlobalResolver>) -> Self {
        self.analyzer = Analyzer::with_resolver(resolver);
        self
    }

    pub fn with_generator(mut self, generator: Box<dyn BytecodeGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn parse(&self, source: &str) -> CompileResult<Program> {
        if self.config.dump_tokens {
            eprintln!("=== Tokens ===");
            eprint!("{}", frontend::dump_tokens(source)?);
            eprintln!("=== End Tokens ===\n");
        }

        debug!(bytes = source.len(), "parsing");
        let program = frontend::parse(source)?;
        debug!(items = program.items.len(), "parsed");

        if self.config.dump_ast {
            eprintln!("=== AST ===");
            eprintln!("{program:#?}");
            eprintln!("=== End AST ===\n");
        }

        Ok(program)
    }

    pub fn analyze(&self, program: &Program) -> AnalysisResult {
        let analysis = self.analyzer.analyze(program);

        if self.config.dump_symbols {
            eprintln!("=== Symbols ===");
            eprint!("{}", analysis.symbols.dump());
            eprintln!("=== End Symbols ===\n");
        }

        analysis
    }

    /// Parse and analyze. Lex and parse failures are errors; problems in the
    /// program itself come back as diagnostics on the result.
    pub fn check(&self, source: &str) -> CompileResult<(Program, AnalysisResult)> {
        let program = self.parse(source)?;
        let analysis = self.analyze(&program);
        Ok((program, analysis))
    }

    /// Build the execution graph. Refuses programs whose analysis reported
    /// errors.
    pub fn assemble(&self, source: &str, program: &Program, analysis: &AnalysisResult) -> CompileResult<Module> {
        if analysis.diagnostics.has_errors() {
            let count = analysis.diagnostics.iter().filter(|d| d.is_error()).count();
            warn!(errors = count, "refusing to assemble a program with errors");
            return Err(CompileError::assembly(format!(
                "cannot assemble a program with {count} error(s)"
            )));
        }

        debug!("assembling module");
        let wasm = self.generator.generate(program, analysis)?;
        let module = Assembler::new(source).assemble(program, analysis, wasm);
        debug!(
            tasks = module.tasks.len(),
            nodes = module.nodes.len(),
            edges = module.edges.len(),
            "assembled module"
        );
        Ok(module)
    }

    /// Run every stage and return the assembled module
    pub fn compile(&self, source: &str) -> CompileResult<Module> {
        let (program, analysis) = self.check(source)?;
        self.assemble(source, &program, &analysis)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

/// Build a resolver from a JSON object mapping channel names to element
/// types, e.g. `{"sensor": "f64", "trace": "series f32"}`
pub fn channels_from_json(json: &str) -> CompileResult<MapResolver> {
    let entries: IndexMap<String, String> = serde_json::from_str(json)?;
    let mut resolver = MapResolver::new();
    for (name, elem) in entries {
        let elem = frontend::parse_type(&elem)?.to_type();
        debug!(channel = %name, elem = %elem, "loaded channel");
        resolver = resolver.with(name, SymbolKind::Channel, Type::chan(elem));
    }
    Ok(resolver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::{MapResolver, SymbolKind};
    use crate::types::Type;
    use pretty_assertions::assert_eq;

    fn pipeline() -> Pipeline {
        let resolver = MapResolver::new()
            .with("sensor", SymbolKind::Channel, Type::chan(Type::F64))
            .with("out", SymbolKind::Channel, Type::chan(Type::F64));
        Pipeline::default().with_resolver(Arc::new(resolver))
    }

    struct Fixed(Vec<u8>);

    impl BytecodeGenerator for Fixed {
        fn generate(&self, _program: &Program, _analysis: &AnalysisResult) -> CompileResult<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_check_reports_diagnostics() {
        let (_, analysis) = pipeline().check("func f() i32 {\n\treturn missing\n}\n").unwrap();
        assert!(!analysis.is_ok());
        assert_eq!(
            analysis.diagnostics.first().map(|d| d.message.as_str()),
            Some("undefined symbol: missing")
        );
    }

    #[test]
    fn test_check_propagates_parse_errors() {
        let result = pipeline().check("func f( {");
        assert!(matches!(result, Err(CompileError::Parser { .. })));
    }

    #[test]
    fn test_assemble_refuses_errors() {
        let source = "func f() i32 {\n\treturn 1.5\n}\n";
        let pipeline = pipeline();
        let (program, analysis) = pipeline.check(source).unwrap();
        let result = pipeline.assemble(source, &program, &analysis);
        assert!(matches!(result, Err(CompileError::Assembly { .. })));
    }

    #[test]
    fn test_compile_builds_module() {
        let source = "\
task half(v f64) f64 {
\treturn v / 2
}

sensor -> half{} -> out
";
        let module = pipeline().compile(source).unwrap();
        let types: Vec<&str> = module.nodes.iter().map(|n| n.node_type.as_str()).collect();
        assert_eq!(types, vec!["on", "half", "write"]);
        assert_eq!(module.edges.len(), 2);
        assert!(module.wasm.is_empty());
    }

    #[test]
    fn test_channels_from_json() {
        let resolver = channels_from_json(r#"{"sensor": "f64", "trace": "series i32"}"#).unwrap();
        assert_eq!(
            resolver.resolve("trace").and_then(|s| s.ty),
            Some(Type::chan(Type::series(Type::I32)))
        );

        let pipeline = Pipeline::default().with_resolver(Arc::new(resolver));
        let module = pipeline.compile("sensor -> sensor\n").unwrap();
        assert_eq!(module.nodes.len(), 2);
    }

    #[test]
    fn test_channels_from_json_rejects_bad_input() {
        assert!(matches!(channels_from_json("[1, 2]"), Err(CompileError::Serialize(_))));
        assert!(matches!(channels_from_json(r#"{"sensor": "float"}"#), Err(CompileError::Parser { .. })));
    }

    #[test]
    fn test_compile_uses_generator() {
        let pipeline = pipeline().with_generator(Box::new(Fixed(vec![0, 97, 115, 109])));
        let module = pipeline.compile("sensor -> out\n").unwrap();
        assert_eq!(module.wasm, vec![0, 97, 115, 109]);
    }
}
