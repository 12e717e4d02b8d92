use rquickjs::loader::{Loader, Resolver};
use rquickjs::module::WriteOptions;
use rquickjs::{Ctx, Error, Module, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, trace};

/// Ordered module search directories, shared between the resolver and the
/// `addSiteDir` hook so directories registered after startup take part in
/// resolution immediately.
#[derive(Debug, Clone)]
pub struct SearchPaths {
    dirs: Arc<RwLock<Vec<PathBuf>>>,
}

impl SearchPaths {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs: Arc::new(RwLock::new(dirs)),
        }
    }

    /// Appends a directory to the end of the search order. Directories
    /// already present are not duplicated.
    pub fn push(&self, dir: PathBuf) {
        let mut dirs = self.dirs.write().unwrap_or_else(PoisonError::into_inner);
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }

    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.dirs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Resolves import specifiers against the search directories.
///
/// Bare specifiers probe each directory in order for `<name>.js`, then
/// `<name>.jsc`. Relative specifiers resolve against the importing module's
/// own path. Specifiers that already carry a module extension are probed
/// exactly.
pub struct SearchPathResolver {
    search_paths: SearchPaths,
}

impl SearchPathResolver {
    pub fn new(search_paths: SearchPaths) -> Self {
        Self { search_paths }
    }
}

impl Resolver for SearchPathResolver {
    fn resolve(&mut self, _ctx: &Ctx, base: &str, name: &str) -> Result<String> {
        trace!("resolving \"{name}\" imported from \"{base}\"");

        // Relative paths (./xxx or ../xxx) resolve against the importer
        if name.starts_with("./") || name.starts_with("../") {
            let base_path = Path::new(base);
            let base_dir = if base_path.is_file() {
                base_path.parent().unwrap_or(Path::new("."))
            } else {
                base_path
            };

            if let Some(found) = try_resolve_module(&base_dir.join(name)) {
                return Ok(found);
            }
            return Err(Error::new_resolving(name, "Module not found"));
        }

        let path = Path::new(name);
        if path.is_absolute() {
            if let Some(found) = try_resolve_module(path) {
                return Ok(found);
            }
            return Err(Error::new_resolving(name, "Module not found"));
        }

        // Bare specifier: probe the search directories in order
        for dir in self.search_paths.snapshot() {
            if let Some(found) = try_resolve_module(&dir.join(name)) {
                return Ok(found);
            }
        }

        Err(Error::new_resolving(name, "Module not found"))
    }
}

fn has_module_extension(path: &Path) -> bool {
    matches!(
        path.extension().and_then(OsStr::to_str),
        Some("js" | "jsc")
    )
}

fn try_resolve_file(path: &Path) -> Option<String> {
    // Try exact path only
    if path.exists() && path.is_file() {
        return path.to_str().map(ToString::to_string);
    }

    None
}

fn try_resolve_module(candidate: &Path) -> Option<String> {
    if has_module_extension(candidate) {
        return try_resolve_file(candidate);
    }

    // Extension-less specifier: source first, compiled second
    let mut source = candidate.as_os_str().to_os_string();
    source.push(".js");
    if let Some(found) = try_resolve_file(Path::new(&source)) {
        return Some(found);
    }

    let mut compiled = candidate.as_os_str().to_os_string();
    compiled.push(".jsc");
    try_resolve_file(Path::new(&compiled))
}

/// Loads resolved module paths: `.js` as source, `.jsc` as QuickJS bytecode.
pub struct FileLoader {
    write_bytecode: bool,
}

impl FileLoader {
    pub fn new(write_bytecode: bool) -> Self {
        Self { write_bytecode }
    }

    // Cache writes are best-effort: a read-only installation tree is not an
    // error, the module simply loads from source every time.
    fn write_cache(module: &Module<'_>, name: &str) {
        let Some(stem) = name.strip_suffix(".js") else {
            return;
        };
        let cache_path = format!("{stem}.jsc");
        let Ok(bytecode) = module.write(WriteOptions::default()) else {
            return;
        };
        if std::fs::write(&cache_path, bytecode).is_err() {
            trace!("could not write bytecode cache \"{cache_path}\"");
        }
    }
}

impl Loader for FileLoader {
    fn load<'js>(&mut self, ctx: &Ctx<'js>, name: &str) -> Result<Module<'js>> {
        let path = Path::new(name);
        if !(path.exists() && path.is_file()) {
            return Err(Error::new_loading(name));
        }

        if name.ends_with(".jsc") {
            debug!("loading compiled module \"{name}\"");
            let bytecode = std::fs::read(path)
                .map_err(|e| Error::new_loading_message(name, e.to_string()))?;

            // Bytecode is produced by `Module::write` on the same engine
            // version; the installation tree is trusted input.
            return unsafe { Module::load(ctx.clone(), &bytecode) };
        }

        debug!("loading module \"{name}\"");
        let source = std::fs::read_to_string(path)
            .map_err(|e| Error::new_loading_message(name, e.to_string()))?;
        let module = Module::declare(ctx.clone(), name, source)?;

        if self.write_bytecode {
            Self::write_cache(&module, name);
        }

        Ok(module)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code: unwrap is acceptable
mod tests {
    use super::*;
    use rquickjs::{Context, Runtime};
    use std::fs;
    use tempfile::TempDir;

    fn test_context() -> (Runtime, Context) {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        (runtime, context)
    }

    #[test]
    fn test_push_does_not_duplicate() {
        let paths = SearchPaths::new(vec![PathBuf::from("/a")]);
        paths.push(PathBuf::from("/b"));
        paths.push(PathBuf::from("/b"));
        paths.push(PathBuf::from("/a"));
        assert_eq!(
            paths.snapshot(),
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
    }

    #[test]
    fn test_bare_specifier_probes_directories_in_order() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(first.path().join("dep.js"), "export default 1;").unwrap();
        fs::write(second.path().join("dep.js"), "export default 2;").unwrap();

        let paths = SearchPaths::new(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        let mut resolver = SearchPathResolver::new(paths);

        let (_runtime, context) = test_context();
        let resolved = context
            .with(|ctx| resolver.resolve(&ctx, "<main>", "dep"))
            .unwrap();
        assert_eq!(resolved, first.path().join("dep.js").to_str().unwrap());
    }

    #[test]
    fn test_source_preferred_over_compiled() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("dep.js"), "export default 1;").unwrap();
        fs::write(dir.path().join("dep.jsc"), b"\x00stale").unwrap();

        let paths = SearchPaths::new(vec![dir.path().to_path_buf()]);
        let mut resolver = SearchPathResolver::new(paths);

        let (_runtime, context) = test_context();
        let resolved = context
            .with(|ctx| resolver.resolve(&ctx, "<main>", "dep"))
            .unwrap();
        assert!(resolved.ends_with("dep.js"));
    }

    #[test]
    fn test_specifier_with_extension_resolves_exactly() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("dep.js"), "export default 1;").unwrap();

        let paths = SearchPaths::new(vec![dir.path().to_path_buf()]);
        let mut resolver = SearchPathResolver::new(paths);

        let (_runtime, context) = test_context();
        context.with(|ctx| {
            let resolved = resolver.resolve(&ctx, "<main>", "dep.js").unwrap();
            assert!(resolved.ends_with("dep.js"));
            assert!(resolver.resolve(&ctx, "<main>", "dep.jsc").is_err());
        });
    }

    #[test]
    fn test_absolute_specifier_bypasses_search_directories() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("dep.js"), "export default 1;").unwrap();

        let mut resolver = SearchPathResolver::new(SearchPaths::new(Vec::new()));

        let (_runtime, context) = test_context();
        context.with(|ctx| {
            let absolute = dir.path().join("dep");
            let resolved = resolver
                .resolve(&ctx, "<main>", absolute.to_str().unwrap())
                .unwrap();
            assert_eq!(resolved, dir.path().join("dep.js").to_str().unwrap());

            let ghost = dir.path().join("ghost");
            assert!(resolver.resolve(&ctx, "<main>", ghost.to_str().unwrap()).is_err());
        });
    }

    #[test]
    fn test_relative_specifier_resolves_against_importer() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(dir.path().join("entry.js"), "import './nested/dep';").unwrap();
        fs::write(nested.join("dep.js"), "export default 1;").unwrap();

        let base = dir.path().join("entry.js");
        let mut resolver = SearchPathResolver::new(SearchPaths::new(Vec::new()));

        let (_runtime, context) = test_context();
        let resolved = context
            .with(|ctx| resolver.resolve(&ctx, base.to_str().unwrap(), "./nested/dep"))
            .unwrap();
        // The joined path is not lexically normalized
        assert!(resolved.ends_with("nested/dep.js"));
        assert!(Path::new(&resolved).is_file());
    }

    #[test]
    fn test_missing_module_does_not_resolve() {
        let dir = TempDir::new().unwrap();
        let paths = SearchPaths::new(vec![dir.path().to_path_buf()]);
        let mut resolver = SearchPathResolver::new(paths);

        let (_runtime, context) = test_context();
        context.with(|ctx| {
            assert!(resolver.resolve(&ctx, "<main>", "absent").is_err());
        });
    }

    #[test]
    fn test_loader_writes_bytecode_cache_when_enabled() {
        let dir = TempDir::new().unwrap();
        let module_path = dir.path().join("dep.js");
        fs::write(&module_path, "export const n = 1;").unwrap();

        let (_runtime, context) = test_context();
        context.with(|ctx| {
            let mut loader = FileLoader::new(true);
            loader.load(&ctx, module_path.to_str().unwrap()).unwrap();
        });

        let cache_path = dir.path().join("dep.jsc");
        assert!(cache_path.exists());

        // The cache must load back as bytecode
        let (_runtime, context) = test_context();
        context.with(|ctx| {
            let mut loader = FileLoader::new(false);
            loader.load(&ctx, cache_path.to_str().unwrap()).unwrap();
        });
    }

    #[test]
    fn test_loader_leaves_tree_untouched_when_cache_disabled() {
        let dir = TempDir::new().unwrap();
        let module_path = dir.path().join("dep.js");
        fs::write(&module_path, "export const n = 1;").unwrap();

        let (_runtime, context) = test_context();
        context.with(|ctx| {
            let mut loader = FileLoader::new(false);
            loader.load(&ctx, module_path.to_str().unwrap()).unwrap();
        });

        assert!(!dir.path().join("dep.jsc").exists());
    }
}
