//! `curlpack matrix` command

use anyhow::{Context, Result};

use crate::cli::MatrixArgs;
use crate::commands::load_project_config;
use curlpack::core::Os;
use curlpack::ops::matrix::{generate, plan_json, run, MatrixAxes, MatrixOptions, UploadTarget};
use curlpack::ops::{CiIdentity, Credentials};
use curlpack::util::process::SystemRunner;
use curlpack::util::shell::{Shell, Status};

pub fn execute(args: MatrixArgs, shell: &Shell) -> Result<()> {
    let config = load_project_config()?;
    let recipe = config.recipe(None)?;
    let identity = CiIdentity::from_env(&recipe);
    let os = args.os.unwrap_or_else(Os::host);
    let axes = MatrixAxes::from_env(os, &config.matrix)?;
    let entries = generate(&axes);

    if args.plan {
        println!("{}", plan_json(&entries)?);
        return Ok(());
    }

    shell.status(Status::Info, identity.reference(&recipe.name));

    let upload = if !args.upload {
        None
    } else if identity.should_upload() {
        Some(UploadTarget {
            remote: identity.upload_remote(),
            credentials: Credentials::from_env(&identity.username)?,
            identity: identity.clone(),
        })
    } else {
        shell.status(
            Status::Skipped,
            format!(
                "upload: branch {} is not a stable branch",
                identity.branch.as_deref().unwrap_or("(none)")
            ),
        );
        None
    };

    let mut extra_args = vec!["--lib-version".to_string(), identity.version.clone()];
    for dep in &args.deps.deps {
        extra_args.push("--dep".to_string());
        extra_args.push(format!("{}={}", dep.name, dep.prefix.display()));
    }
    if let Some(ref file) = args.deps.deps_file {
        extra_args.push("--deps-file".to_string());
        extra_args.push(file.display().to_string());
    }
    if args.strict {
        extra_args.push("--strict".to_string());
    }

    let opts = MatrixOptions {
        exe: std::env::current_exe().context("failed to locate the curlpack executable")?,
        work_dir: args.work_dir,
        jobs: args.jobs.or(config.matrix.jobs).unwrap_or(1),
        extra_args,
        upload,
    };
    run(&entries, &opts, &SystemRunner, shell)?;
    Ok(())
}
