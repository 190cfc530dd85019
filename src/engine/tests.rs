//! End-to-end bundling scenarios on a temporary resource tree.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tempfile::TempDir;

use super::*;
use crate::address::{Validity, classify, request_path};
use crate::bundle::BundleSet;
use crate::core::{BuildContext, BundlingError, CancelToken, ResourceType, Result};
use crate::freshness::Blake3Hasher;
use crate::generator::{
    Generated, Generator, GeneratorContext, GeneratorEnv, GeneratorFactory, Resolver,
};
use crate::postprocess::{BrowserConditionalPostProcessor, LicensePostProcessor};
use crate::rebuild::RebuildCoordinator;
use crate::resource::FsResourceReader;
use crate::store::{BundleMapping, MemoryBundleStore};
use crate::variant::{VariantSet, VariantSpace};

fn write(root: &Path, path: &str, content: &str) {
    let path = root.join(path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Rewrite a file and push its mtime forward so the change is visible.
fn edit(root: &Path, path: &str, content: &str) {
    write(root, path, content);
    fs::File::options()
        .write(true)
        .open(root.join(path))
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(5))
        .unwrap();
}

struct Fixture {
    dir: TempDir,
    store: Arc<MemoryBundleStore>,
    engine: BundlingEngine,
}

impl Fixture {
    fn new(files: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        for (path, content) in files {
            write(dir.path(), path, content);
        }
        let reader: Arc<dyn ResourceReader> = Arc::new(FsResourceReader::new(dir.path()));
        let registries = Arc::new(GeneratorRegistries::new(GeneratorEnv {
            reader: Arc::clone(&reader),
            classpath: Vec::new(),
            working_dir: dir.path().join(".work"),
            use_cache: false,
        }));
        let store = Arc::new(MemoryBundleStore::new());
        let engine = BundlingEngine::new(reader, registries, store.clone())
            .with_hasher(Some(Arc::new(Blake3Hasher::new(10))));
        Self { dir, store, engine }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn build(&self, bundles: &BundleSet, id: &str) -> Result<()> {
        let ctx = BuildContext::new(CancelToken::new(), CancelToken::new());
        self.engine.build_bundle(bundles, bundles.get(id).unwrap(), &ctx)
    }

    fn content(&self, name: &str) -> String {
        self.store.get_bundle(name).unwrap()
    }
}

#[test]
fn test_main_bundle_lifecycle() {
    let fx = Fixture::new(&[("lib.js", "var L=1;"), ("app.js", "var A=2;")]);
    let bundles = Arc::new(
        BundleSet::new(vec![Bundle::simple(
            "main.js",
            ResourceType::Js,
            ["lib.js", "app.js"],
        )])
        .unwrap(),
    );
    let Fixture { dir, store, engine } = fx;
    let coordinator = RebuildCoordinator::new(engine, Arc::clone(&bundles), "cfg");
    coordinator.build_all().unwrap();

    assert_eq!(store.get_bundle("main.js").unwrap(), "var L=1;\nvar A=2;\n");
    let main = bundles.get("main.js").unwrap();
    let old_path = request_path(main, "");
    assert!(old_path.starts_with("main-") && old_path.ends_with(".js"));
    assert_eq!(classify(&bundles, &old_path), Validity::Valid);

    edit(dir.path(), "app.js", "var A=3;");
    assert_eq!(coordinator.on_paths_changed(&[dir.path().join("app.js")]), ["main.js"]);
    coordinator.rebuild_dirty().unwrap();

    let new_path = request_path(main, "");
    assert_ne!(new_path, old_path);
    assert_eq!(classify(&bundles, &old_path), Validity::Invalid);
    assert_eq!(classify(&bundles, &new_path), Validity::Valid);
    assert_eq!(store.get_bundle("main.js").unwrap(), "var L=1;\nvar A=3;\n");
}

#[test]
fn test_member_order_is_preserved() {
    let fx = Fixture::new(&[("a.js", "a"), ("b.js", "b"), ("c.js", "c")]);
    let bundles = BundleSet::new(vec![Bundle::simple(
        "x.js",
        ResourceType::Js,
        ["c.js", "a.js", "b.js", "a.js"],
    )])
    .unwrap();
    fx.build(&bundles, "x.js").unwrap();
    assert_eq!(fx.content("x.js"), "c\na\nb\n");
}

#[test]
fn test_hash_changes_only_where_content_changes() {
    let fx = Fixture::new(&[("a.js", "a"), ("b.js", "b")]);
    let bundles = BundleSet::new(vec![
        Bundle::simple("a.js", ResourceType::Js, ["a.js"]),
        Bundle::simple("b.js", ResourceType::Js, ["b.js"]),
        Bundle::composite("all.js", ResourceType::Js, ["a.js", "b.js"]),
    ])
    .unwrap();
    for id in ["a.js", "b.js", "all.js"] {
        fx.build(&bundles, id).unwrap();
    }
    let hash = |id: &str| bundles.get(id).unwrap().hash("").unwrap();
    let (a, b, all) = (hash("a.js"), hash("b.js"), hash("all.js"));
    assert_eq!(fx.content("all.js"), "a\nb\n");

    write(fx.root(), "a.js", "a2");
    for id in ["a.js", "all.js"] {
        fx.build(&bundles, id).unwrap();
    }
    assert_ne!(hash("a.js"), a);
    assert_eq!(hash("b.js"), b);
    assert_ne!(hash("all.js"), all);
}

#[test]
fn test_directory_members() {
    let fx = Fixture::new(&[
        ("lib/b.js", "b"),
        ("lib/a.js", "a"),
        ("lib/style.css", "x{}"),
        ("lib/sub/c.js", "c"),
    ]);
    let bundles = BundleSet::new(vec![
        Bundle::simple("flat.js", ResourceType::Js, ["lib/"]),
        Bundle::simple("deep.js", ResourceType::Js, ["lib/**"]),
    ])
    .unwrap();
    fx.build(&bundles, "flat.js").unwrap();
    fx.build(&bundles, "deep.js").unwrap();

    assert_eq!(fx.content("flat.js"), "a\nb\n");
    assert_eq!(fx.content("deep.js"), "a\nb\nc\n");
    let state = bundles.get("flat.js").unwrap().state();
    assert!(state.watched_dirs.iter().any(|d| d.ends_with("lib")));
}

#[test]
fn test_missing_member_is_skipped() {
    let fx = Fixture::new(&[("a.js", "a")]);
    let bundles =
        BundleSet::new(vec![Bundle::simple("x.js", ResourceType::Js, ["a.js", "gone.js"])]).unwrap();
    fx.build(&bundles, "x.js").unwrap();
    assert_eq!(fx.content("x.js"), "a\n");

    // Tracked anyway, so creating it later dirties the bundle
    let state = bundles.get("x.js").unwrap().state();
    assert_eq!(
        state.linked.iter().find(|(p, _)| p.ends_with("gone.js")).map(|(_, &m)| m),
        Some(0)
    );
}

#[test]
fn test_bom_is_stripped_after_first_member() {
    let fx = Fixture::new(&[("a.css", "\u{feff}a{}"), ("b.css", "\u{feff}b{}")]);
    let bundles =
        BundleSet::new(vec![Bundle::simple("x.css", ResourceType::Css, ["a.css", "b.css"])]).unwrap();
    fx.build(&bundles, "x.css").unwrap();
    assert_eq!(fx.content("x.css"), "\u{feff}a{}\nb{}\n");
}

#[test]
fn test_browser_variants_are_discovered() {
    let fx = Fixture::new(&[(
        "a.css",
        "a{}\n/* @browser ie6 */\nb{}\n/* @end */\nc{}\n",
    )]);
    let bundle = Bundle::simple("site.css", ResourceType::Css, ["a.css"])
        .with_postprocess(Some(Arc::new(BrowserConditionalPostProcessor)));
    let bundles = BundleSet::new(vec![bundle]).unwrap();
    fx.build(&bundles, "site.css").unwrap();

    let site = bundles.get("site.css").unwrap();
    let browsers = site.variants();
    let browsers = browsers.get("browser").unwrap();
    assert_eq!(browsers.values, ["", "ie6"]);
    assert_eq!(fx.content("site.css"), "a{}\nc{}\n");
    assert_eq!(fx.content("site@ie6.css"), "a{}\nb{}\nc{}\n");
}

#[test]
fn test_composite_discovers_variants_its_children_do_not() {
    let fx = Fixture::new(&[
        ("a.js", "var a;\n/* @browser ie6 */\nvar ie = 6;\n/* @end */\n"),
        ("b.js", "var b;"),
    ]);
    let bundles = BundleSet::new(vec![
        Bundle::simple("a.js", ResourceType::Js, ["a.js"]),
        Bundle::simple("b.js", ResourceType::Js, ["b.js"]),
        Bundle::composite("all.js", ResourceType::Js, ["a.js", "b.js"])
            .with_postprocess(Some(Arc::new(BrowserConditionalPostProcessor))),
    ])
    .unwrap();
    fx.build(&bundles, "a.js").unwrap();
    fx.build(&bundles, "b.js").unwrap();
    fx.build(&bundles, "all.js").unwrap();

    // Children keep their single unvaried output
    assert!(bundles.get("a.js").unwrap().variants().is_empty());
    assert!(fx.content("a.js").contains("@browser"));

    let all = bundles.get("all.js").unwrap();
    let space = all.variants();
    assert_eq!(space.get("browser").unwrap().values, ["", "ie6"]);
    assert_eq!(fx.content("all.js"), "var a;\nvar b;\n");
    assert_eq!(fx.content("all@ie6.js"), "var a;\nvar ie = 6;\nvar b;\n");
    assert_ne!(all.hash(""), all.hash("ie6"));
}

#[test]
fn test_composite_runs_own_processors() {
    let fx = Fixture::new(&[
        ("a.js", "/*! A license */\nvar a;"),
        ("b.js", "/*! B license */\nvar b;"),
    ]);
    let bundles = BundleSet::new(vec![
        Bundle::simple("a.js", ResourceType::Js, ["a.js"]),
        Bundle::simple("b.js", ResourceType::Js, ["b.js"]),
        Bundle::composite("all.js", ResourceType::Js, ["a.js", "b.js"])
            .with_postprocess(Some(Arc::new(LicensePostProcessor))),
    ])
    .unwrap();
    fx.build(&bundles, "all.js").unwrap();

    let content = fx.content("all.js");
    assert!(content.starts_with("/*! A license */"));
    let a = content.find("var a;").unwrap();
    let b = content.find("var b;").unwrap();
    assert!(a < b);
    assert!(content.find("/*! B license */").unwrap() < a);
}

#[test]
fn test_debug_only_child_is_left_out() {
    let fx = Fixture::new(&[("a.js", "a"), ("dbg.js", "dbg")]);
    let mut debug = Bundle::simple("dbg.js", ResourceType::Js, ["dbg.js"]);
    debug.debug_only = true;
    let bundles = BundleSet::new(vec![
        Bundle::simple("a.js", ResourceType::Js, ["a.js"]),
        debug,
        Bundle::composite("all.js", ResourceType::Js, ["a.js", "dbg.js"]),
    ])
    .unwrap();
    fx.build(&bundles, "all.js").unwrap();
    assert_eq!(fx.content("all.js"), "a\n");
}

#[test]
fn test_live_placeholder_marks_bundle() {
    let fx = Fixture::new(&[("a.js", "var here = \"{{SHEAF_BUNDLE_PATH}}\";"), ("b.js", "b")]);
    let bundles = BundleSet::new(vec![
        Bundle::simple("a.js", ResourceType::Js, ["a.js"]),
        Bundle::simple("b.js", ResourceType::Js, ["b.js"]),
    ])
    .unwrap();
    fx.build(&bundles, "a.js").unwrap();
    fx.build(&bundles, "b.js").unwrap();
    assert_eq!(fx.engine.live_bundles(&bundles), ["a.js"]);
}

struct FailingGenerator;

impl Generator for FailingGenerator {
    fn create_resource(&self, ctx: &GeneratorContext<'_>) -> Result<Generated> {
        Err(BundlingError::generator("fail", ctx.path, "boom"))
    }
}

#[test]
fn test_generator_error_fails_only_that_bundle() {
    let fx = Fixture::new(&[("a.js", "a")]);
    let factory: GeneratorFactory = Arc::new(|| Box::new(FailingGenerator));
    fx.engine
        .registries()
        .get(ResourceType::Js)
        .register(Resolver::prefix("fail"), "fail", factory)
        .unwrap();

    let bundles = Arc::new(
        BundleSet::new(vec![
            Bundle::simple("ok.js", ResourceType::Js, ["a.js"]),
            Bundle::simple("bad.js", ResourceType::Js, ["a.js", "fail:x.js"]),
        ])
        .unwrap(),
    );
    let Fixture { dir: _dir, store, engine } = fx;
    let coordinator = RebuildCoordinator::new(engine, Arc::clone(&bundles), "cfg");
    let report = coordinator.build_all().unwrap();

    assert_eq!(report.built, ["ok.js"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "bad.js");
    assert!(report.failed[0].1.contains("boom"));
    assert!(store.contains("ok.js"));
    assert!(!store.contains("bad.js"));
    assert!(bundles.get("bad.js").unwrap().is_dirty());
}

#[test]
fn test_cancelled_build_publishes_nothing() {
    let fx = Fixture::new(&[("a.js", "a")]);
    let bundles = BundleSet::new(vec![Bundle::simple("x.js", ResourceType::Js, ["a.js"])]).unwrap();
    let run = CancelToken::new();
    run.cancel();
    let ctx = BuildContext::new(run, CancelToken::new());

    let err = fx
        .engine
        .build_bundle(&bundles, bundles.get("x.js").unwrap(), &ctx)
        .unwrap_err();
    assert!(err.is_interrupted());
    assert!(bundles.get("x.js").unwrap().hash("").is_none());
    assert!(!fx.store.contains("x.js"));
}

/// Memory store that refuses writes to one bundle name while armed.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryBundleStore,
    fail_on: Mutex<Option<String>>,
}

impl BundleStore for FlakyStore {
    fn store_bundle(&self, name: &str, content: &str) -> Result<()> {
        if self.fail_on.lock().as_deref() == Some(name) {
            return Err(BundlingError::Store(format!("disk full writing {name}")));
        }
        self.inner.store_bundle(name, content)
    }

    fn get_bundle(&self, name: &str) -> Result<String> {
        self.inner.get_bundle(name)
    }

    fn get_bundle_bytes(&self, name: &str, gzip: bool) -> Result<Vec<u8>> {
        self.inner.get_bundle_bytes(name, gzip)
    }

    fn contains(&self, name: &str) -> bool {
        self.inner.contains(name)
    }

    fn store_mapping(&self, mapping: &BundleMapping) -> Result<()> {
        self.inner.store_mapping(mapping)
    }

    fn get_mapping(&self) -> Result<Option<BundleMapping>> {
        self.inner.get_mapping()
    }

    fn mapping_exists(&self) -> bool {
        self.inner.mapping_exists()
    }
}

#[test]
fn test_failed_store_keeps_content_matching_hashes() {
    let fx = Fixture::new(&[("a.js", "var a;")]);
    let store = Arc::new(FlakyStore::default());
    let engine = BundlingEngine::new(
        Arc::clone(fx.engine.reader()),
        Arc::clone(fx.engine.registries()),
        store.clone(),
    )
    .with_hasher(Some(Arc::new(Blake3Hasher::new(10))));
    let themes: VariantSpace = [VariantSet::new("theme", "light", ["light", "dark"])]
        .into_iter()
        .collect();
    let bundles =
        BundleSet::new(vec![Bundle::simple("t.js", ResourceType::Js, ["a.js"]).with_variants(themes)])
            .unwrap();
    let bundle = bundles.get("t.js").unwrap();
    let ctx = BuildContext::new(CancelToken::new(), CancelToken::new());

    engine.build_bundle(&bundles, bundle, &ctx).unwrap();
    let before = bundle.state();

    // `t@light.js` is written before the failing `t@dark.js`
    edit(fx.root(), "a.js", "var a2;");
    *store.fail_on.lock() = Some("t@dark.js".into());
    let err = engine.build_bundle(&bundles, bundle, &ctx).unwrap_err();
    assert!(matches!(err, BundlingError::Store(_)));

    assert_eq!(bundle.state().hashes, before.hashes);
    for name in ["t@light.js", "t@dark.js", "t.js"] {
        assert_eq!(store.get_bundle(name).unwrap(), "var a;\n", "{name}");
    }

    *store.fail_on.lock() = None;
    engine.build_bundle(&bundles, bundle, &ctx).unwrap();
    assert_ne!(bundle.state().hashes, before.hashes);
    assert_eq!(store.get_bundle("t@light.js").unwrap(), "var a2;\n");
}
