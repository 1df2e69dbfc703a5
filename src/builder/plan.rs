//! Build plan generation.
//!
//! A `BuildPlan` is the translation of one configuration into what the
//! selected build system is invoked with: an ordered argument list and an
//! environment overlay. Every flag-mapped option contributes exactly one of
//! its on/off variants, so the same configuration always yields the same
//! plan.

use serde::Serialize;

use crate::builder::context::BuildContext;
use crate::builder::env::BuildEnv;
use crate::builder::strategy::BuildStrategy;
use crate::core::dependency::{declare_requirements, LIBSSH2, OPENSSL, ZLIB};
use crate::core::errors::ConfigError;
use crate::core::options::OptionKey;
use crate::core::settings::{Arch, BuildType};
use crate::util::fs::posix_path;

/// Autotools spelling of the static-linkage macro.
pub const STATIC_CPPFLAG: &str = "-DCURL_STATICLIB=1";

/// Compiler switch the winbuild makefiles get for static linkage.
const WINBUILD_STATIC_SWITCH: &str = "/DCURL_STATICLIB";

/// The flags an option translated to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionFlag {
    pub key: OptionKey,
    pub enabled: bool,
    /// Arguments for the selected variant; may be empty when the build
    /// system has no spelling for it
    pub flags: Vec<String>,
}

impl OptionFlag {
    fn new(key: OptionKey, enabled: bool, flags: impl IntoIterator<Item = String>) -> Self {
        OptionFlag {
            key,
            enabled,
            flags: flags.into_iter().collect(),
        }
    }

    /// `--with-X` / `--without-X`
    fn with(key: OptionKey, enabled: bool, feature: &str) -> Self {
        let prefix = if enabled { "with" } else { "without" };
        Self::new(key, enabled, [format!("--{}-{}", prefix, feature)])
    }

    /// `--enable-X` / `--disable-X`
    fn enable(key: OptionKey, enabled: bool, feature: &str) -> Self {
        let prefix = if enabled { "enable" } else { "disable" };
        Self::new(key, enabled, [format!("--{}-{}", prefix, feature)])
    }
}

/// A complete build plan.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub strategy: BuildStrategy,

    /// Per-option translation, in emission order
    pub option_flags: Vec<OptionFlag>,

    /// Arguments to the configure step (`configure`, `cmake`) or, for the
    /// winbuild makefiles, to `nmake`
    pub args: Vec<String>,

    /// Overlay applied to every external step
    pub env: BuildEnv,
}

impl BuildPlan {
    /// Translate a configuration.
    ///
    /// Fails when a dependency whose install location ends up in a flag was
    /// not provided.
    pub fn new(ctx: &BuildContext) -> Result<Self, ConfigError> {
        let strategy = BuildStrategy::select(&ctx.settings)?;
        let plan = match strategy {
            BuildStrategy::Autotools | BuildStrategy::CrossAutotools { .. } => {
                autotools_plan(ctx, strategy)?
            }
            BuildStrategy::CMakeProject => cmake_plan(ctx)?,
            BuildStrategy::Manual => winbuild_plan(ctx)?,
        };
        tracing::debug!("{} args: {}", strategy, plan.args.join(" "));
        Ok(plan)
    }

    /// Translation of a single option.
    pub fn flag_for(&self, key: OptionKey) -> Option<&OptionFlag> {
        self.option_flags.iter().find(|f| f.key == key)
    }

    /// Whether the build defines the static-linkage macro.
    pub fn defines_static_macro(&self) -> bool {
        match self.strategy {
            BuildStrategy::Autotools | BuildStrategy::CrossAutotools { .. } => self
                .env
                .get("CPPFLAGS")
                .map_or(false, |flags| flags.split_whitespace().any(|f| f == STATIC_CPPFLAG)),
            BuildStrategy::CMakeProject => self.args.iter().any(|a| a == "-DCURL_STATICLIB=ON"),
            BuildStrategy::Manual => self
                .env
                .get("CL")
                .map_or(false, |cl| cl.split_whitespace().any(|f| f == WINBUILD_STATIC_SWITCH)),
        }
    }
}

/// `configure` flags for every flag-mapped option.
pub fn autotools_option_flags(ctx: &BuildContext) -> Result<Vec<OptionFlag>, ConfigError> {
    let options = &ctx.options;
    let mut flags = Vec::new();

    let idn = if ctx.version.uses_idn2() { "libidn2" } else { "libidn" };
    flags.push(OptionFlag::with(OptionKey::WithLibidn, options.with_libidn, idn));
    flags.push(OptionFlag::with(
        OptionKey::WithLibrtmp,
        options.with_librtmp,
        "librtmp",
    ));
    flags.push(OptionFlag::with(
        OptionKey::WithLibmetalink,
        options.with_libmetalink,
        "libmetalink",
    ));
    if let Some(psl) = options.with_libpsl {
        flags.push(OptionFlag::with(OptionKey::WithLibpsl, psl, "libpsl"));
    }
    flags.push(OptionFlag::with(
        OptionKey::WithNghttp2,
        options.with_nghttp2,
        "nghttp2",
    ));

    let ssl = if options.uses_darwin_ssl() {
        "--with-darwinssl".to_string()
    } else if options.with_openssl {
        format!("--with-ssl={}", posix_path(&ctx.deps.get(OPENSSL)?.rootpath))
    } else {
        "--without-ssl".to_string()
    };
    flags.push(OptionFlag::new(
        OptionKey::WithOpenssl,
        options.with_openssl,
        [ssl],
    ));

    let ssh2 = if options.with_libssh2 {
        let dep = ctx.deps.get(LIBSSH2)?;
        let lib_path = dep.lib_paths.first().unwrap_or(&dep.rootpath);
        format!("--with-libssh2={}", posix_path(lib_path))
    } else {
        "--without-libssh2".to_string()
    };
    flags.push(OptionFlag::new(
        OptionKey::WithLibssh2,
        options.with_libssh2,
        [ssh2],
    ));

    let linkage = if options.shared {
        ["--enable-shared", "--disable-static"]
    } else {
        ["--disable-shared", "--enable-static"]
    };
    flags.push(OptionFlag::new(
        OptionKey::Shared,
        options.shared,
        linkage.iter().map(|s| s.to_string()),
    ));

    let threads = if options.disable_threads {
        "--disable-thread"
    } else {
        "--enable-thread"
    };
    flags.push(OptionFlag::new(
        OptionKey::DisableThreads,
        options.disable_threads,
        [threads.to_string()],
    ));

    flags.push(OptionFlag::enable(OptionKey::WithLdap, options.with_ldap, "ldap"));

    let cacert = if options.custom_cacert {
        "--with-ca-bundle=cacert.pem"
    } else {
        "--without-ca-bundle"
    };
    flags.push(OptionFlag::new(
        OptionKey::CustomCacert,
        options.custom_cacert,
        [cacert.to_string()],
    ));

    Ok(flags)
}

fn autotools_plan(ctx: &BuildContext, strategy: BuildStrategy) -> Result<BuildPlan, ConfigError> {
    let option_flags = autotools_option_flags(ctx)?;

    let mut args = vec![format!("--prefix={}", posix_path(&ctx.package_dir))];
    args.extend(option_flags.iter().flat_map(|f| f.flags.iter().cloned()));
    args.push(format!(
        "--with-zlib={}",
        posix_path(&ctx.deps.get(ZLIB)?.rootpath)
    ));
    if let BuildStrategy::CrossAutotools { triple } = strategy {
        args.push(format!("--build={}", triple));
        args.push(format!("--host={}", triple));
    }

    let env = autotools_env(ctx, strategy)?;
    Ok(BuildPlan {
        strategy,
        option_flags,
        args,
        env,
    })
}

/// CPPFLAGS, CFLAGS, LDFLAGS and LIBS the way autoconf consumes them.
fn autotools_env(ctx: &BuildContext, strategy: BuildStrategy) -> Result<BuildEnv, ConfigError> {
    let settings = &ctx.settings;
    let mut env = BuildEnv::new();

    for req in declare_requirements(&ctx.options, settings) {
        let dep = ctx.deps.get(&req.name)?;
        for dir in &dep.include_paths {
            env.append("CPPFLAGS", &format!("-I{}", posix_path(dir)));
        }
        for define in &dep.defines {
            env.append("CPPFLAGS", &format!("-D{}", define));
        }
        for dir in &dep.lib_paths {
            env.append("LDFLAGS", &format!("-L{}", posix_path(dir)));
        }
        for lib in &dep.libs {
            env.append("LIBS", &format!("-l{}", lib));
        }
    }

    if let Some(flag) = arch_flag(settings.arch) {
        env.append("CFLAGS", flag);
        env.append("LDFLAGS", flag);
    }
    match settings.build_type {
        BuildType::Release => {
            env.append("CPPFLAGS", "-DNDEBUG");
            env.append("CFLAGS", "-O2");
        }
        BuildType::Debug => env.append("CFLAGS", "-g"),
    }
    if ctx.options.is_static() {
        env.append("CPPFLAGS", STATIC_CPPFLAG);
    }

    if let BuildStrategy::CrossAutotools { .. } = strategy {
        if settings.arch == Arch::X86_64 {
            env.append("CPPFLAGS", "-D_AMD64_");
        }
        let target = if settings.arch == Arch::X86 {
            "pe-i386"
        } else {
            "pe-x86-64"
        };
        env.set("RCFLAGS", format!("-O COFF --target={}", target));
        env.remove("LIBS");
    }

    Ok(env)
}

fn arch_flag(arch: Arch) -> Option<&'static str> {
    match arch {
        Arch::X86_64 => Some("-m64"),
        Arch::X86 => Some("-m32"),
        _ => None,
    }
}

fn on_off(value: bool) -> String {
    let value = if value { "ON" } else { "OFF" };
    value.to_string()
}

fn cmake_plan(ctx: &BuildContext) -> Result<BuildPlan, ConfigError> {
    let options = &ctx.options;
    let settings = &ctx.settings;

    let define = |name: &str, value: String| format!("-D{}={}", name, value);
    let switch = |key: OptionKey, enabled: bool, name: &str| {
        OptionFlag::new(key, enabled, [define(name, on_off(enabled))])
    };

    if options.with_libmetalink {
        return Err(unsupported(OptionKey::WithLibmetalink, BuildStrategy::CMakeProject));
    }

    let mut option_flags = vec![
        OptionFlag::new(
            OptionKey::Shared,
            options.shared,
            [
                define("BUILD_SHARED_LIBS", on_off(options.shared)),
                define("CURL_STATICLIB", on_off(!options.shared)),
            ],
        ),
        OptionFlag::new(
            OptionKey::WithLdap,
            options.with_ldap,
            [define("CURL_DISABLE_LDAP", on_off(!options.with_ldap))],
        ),
        switch(OptionKey::WithOpenssl, options.with_openssl, "CMAKE_USE_OPENSSL"),
        // libssh2 is never declared for Visual Studio
        OptionFlag::new(
            OptionKey::WithLibssh2,
            options.with_libssh2,
            [define("CMAKE_USE_LIBSSH2", on_off(false))],
        ),
        OptionFlag::new(
            OptionKey::DisableThreads,
            options.disable_threads,
            [define(
                "ENABLE_THREADED_RESOLVER",
                on_off(!options.disable_threads),
            )],
        ),
        switch(OptionKey::WithLibidn, options.with_libidn, "USE_LIBIDN2"),
        switch(OptionKey::WithLibrtmp, options.with_librtmp, "USE_LIBRTMP"),
        switch(OptionKey::WithLibmetalink, false, "USE_METALINK"),
        switch(OptionKey::WithNghttp2, options.with_nghttp2, "USE_NGHTTP2"),
        OptionFlag::new(
            OptionKey::CustomCacert,
            options.custom_cacert,
            [define(
                "CURL_CA_BUNDLE",
                if options.custom_cacert { "cacert.pem" } else { "none" }.to_string(),
            )],
        ),
    ];
    if let Some(psl) = options.with_libpsl {
        option_flags.push(switch(OptionKey::WithLibpsl, psl, "CURL_USE_LIBPSL"));
    }

    let mut args = vec!["-A".to_string(), msvc_platform(settings.arch).to_string()];
    args.extend(option_flags.iter().flat_map(|f| f.flags.iter().cloned()));
    args.push(define("BUILD_TESTING", on_off(false)));
    args.push(define("CMAKE_DEBUG_POSTFIX", String::new()));
    args.push(define("CMAKE_BUILD_TYPE", settings.build_type.to_string()));
    args.push(define(
        "CMAKE_INSTALL_PREFIX",
        posix_path(&ctx.package_dir),
    ));

    let mut roots = Vec::new();
    for req in declare_requirements(options, settings) {
        roots.push(posix_path(&ctx.deps.get(&req.name)?.rootpath));
    }
    if options.uses_openssl() {
        args.push(define(
            "OPENSSL_ROOT_DIR",
            posix_path(&ctx.deps.get(OPENSSL)?.rootpath),
        ));
    }
    args.push(define("ZLIB_ROOT", posix_path(&ctx.deps.get(ZLIB)?.rootpath)));
    args.push(define("CMAKE_PREFIX_PATH", roots.join(";")));

    Ok(BuildPlan {
        strategy: BuildStrategy::CMakeProject,
        option_flags,
        args,
        env: BuildEnv::new(),
    })
}

/// Visual Studio generator platform.
fn msvc_platform(arch: Arch) -> &'static str {
    match arch {
        Arch::X86 => "Win32",
        Arch::X86_64 => "x64",
        Arch::Armv7 => "ARM",
        Arch::Armv8 => "ARM64",
    }
}

/// `MACHINE=` value of the winbuild makefiles.
fn winbuild_machine(arch: Arch) -> &'static str {
    match arch {
        Arch::X86 => "x86",
        Arch::X86_64 => "x64",
        Arch::Armv7 => "arm",
        Arch::Armv8 => "arm64",
    }
}

/// Features the winbuild makefiles cannot build in; each is spelled off by
/// undefining the macro that would enable it.
const WINBUILD_UNSUPPORTED: [(OptionKey, &str); 4] = [
    (OptionKey::WithLibrtmp, "USE_LIBRTMP"),
    (OptionKey::WithLibmetalink, "USE_METALINK"),
    (OptionKey::WithLibpsl, "USE_LIBPSL"),
    (OptionKey::CustomCacert, "CURL_CA_BUNDLE"),
];

/// The winbuild makefiles take nmake macros on the command line; compiler
/// switches (`/D`, `/U`) go through `CL` instead.
fn winbuild_plan(ctx: &BuildContext) -> Result<BuildPlan, ConfigError> {
    let options = &ctx.options;
    let settings = &ctx.settings;
    let linkage = if options.shared { "dll" } else { "static" };
    let yes_no = |value: bool| if value { "yes" } else { "no" };
    let with = |enabled: bool| if enabled { linkage } else { "no" };

    if options.disable_threads {
        return Err(unsupported(OptionKey::DisableThreads, BuildStrategy::Manual));
    }

    let ssl = if options.with_openssl {
        format!("WITH_SSL={}", linkage)
    } else {
        "ENABLE_WINSSL=no".to_string()
    };
    let ldap = if options.with_ldap {
        "/DUSE_WIN32_LDAP"
    } else {
        "/DCURL_DISABLE_LDAP"
    };
    let mut option_flags = vec![
        OptionFlag::new(
            OptionKey::Shared,
            options.shared,
            [format!("mode={}", linkage)],
        ),
        OptionFlag::new(OptionKey::WithOpenssl, options.with_openssl, [ssl]),
        OptionFlag::new(
            OptionKey::WithLibssh2,
            options.with_libssh2,
            [format!("WITH_SSH2={}", with(options.with_libssh2))],
        ),
        OptionFlag::new(
            OptionKey::WithLibidn,
            options.with_libidn,
            [format!("ENABLE_IDN={}", yes_no(options.with_libidn))],
        ),
        OptionFlag::new(
            OptionKey::WithNghttp2,
            options.with_nghttp2,
            [format!("WITH_NGHTTP2={}", with(options.with_nghttp2))],
        ),
        OptionFlag::new(OptionKey::WithLdap, options.with_ldap, [ldap.to_string()]),
        OptionFlag::new(
            OptionKey::DisableThreads,
            false,
            ["/DUSE_THREADS_WIN32".to_string()],
        ),
    ];
    for (key, macro_name) in WINBUILD_UNSUPPORTED {
        match options.get(key) {
            Some(true) => return Err(unsupported(key, BuildStrategy::Manual)),
            Some(false) => {
                option_flags.push(OptionFlag::new(key, false, [format!("/U{}", macro_name)]))
            }
            None => {}
        }
    }

    let (switches, macros): (Vec<String>, Vec<String>) = option_flags
        .iter()
        .flat_map(|f| f.flags.iter().cloned())
        .partition(|f| f.starts_with('/'));

    let mut args = vec!["/f".to_string(), "Makefile.vc".to_string()];
    args.extend(macros);
    args.push(format!("MACHINE={}", winbuild_machine(settings.arch)));
    args.push(format!(
        "DEBUG={}",
        yes_no(settings.build_type == BuildType::Debug)
    ));
    args.push(format!("WITH_ZLIB={}", linkage));
    let zlib_root = &ctx.deps.get(ZLIB)?.rootpath;
    args.push(format!("WITH_DEVEL={}", zlib_root.display()));

    let mut env = BuildEnv::new();
    let mut includes = Vec::new();
    let mut libdirs = Vec::new();
    for req in declare_requirements(options, settings) {
        let dep = ctx.deps.get(&req.name)?;
        includes.extend(dep.include_paths.iter().map(|p| p.display().to_string()));
        libdirs.extend(dep.lib_paths.iter().map(|p| p.display().to_string()));
    }
    env.set("INCLUDE", search_path("INCLUDE", &includes));
    env.set("LIB", search_path("LIB", &libdirs));
    if options.is_static() {
        env.append("CL", WINBUILD_STATIC_SWITCH);
    }
    for switch in &switches {
        env.append("CL", switch);
    }

    Ok(BuildPlan {
        strategy: BuildStrategy::Manual,
        option_flags,
        args,
        env,
    })
}

fn unsupported(key: OptionKey, strategy: BuildStrategy) -> ConfigError {
    ConfigError::Unsupported {
        reason: format!("`{}` cannot be enabled for the {}", key, strategy),
    }
}

/// Prepend directories to a `;`-separated search path inherited from the
/// parent environment.
fn search_path(var: &str, dirs: &[String]) -> String {
    let mut parts = dirs.to_vec();
    if let Ok(existing) = std::env::var(var) {
        if !existing.is_empty() {
            parts.push(existing);
        }
    }
    parts.join(";")
}

/// Options that do not translate to a flag for any strategy.
pub fn is_flag_mapped(key: OptionKey) -> bool {
    !matches!(key, OptionKey::DarwinSsl | OptionKey::WithLargemaxwritesize)
}
