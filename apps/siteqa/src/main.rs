//! siteqa CLI binary entry point.
//! Resolves configuration, delegates to the library checks and prints results.
//!
//! Exit codes: 0 pass, 1 failing findings, 2 configuration or runtime error.

use clap::Parser;
use siteqa::a11y::{run_a11y, AxeResultsDir};
use siteqa::cli::{Cli, Commands};
use siteqa::config::{self, Effective, Env};
use siteqa::error::QaError;
use siteqa::fetch::{ConsentCookie, HttpClient};
use siteqa::w3c::{run_w3c, target_urls, NuValidator, Suppressions, W3cRun};
use siteqa::{base, logger, options, output, plan, report, structured};

fn die(e: QaError) -> ! {
    eprintln!("{} {}", output::error_prefix(), e);
    std::process::exit(2);
}

fn setup(
    root: Option<&str>,
    out: Option<&str>,
    reports: Option<&str>,
    results: Option<&str>,
) -> (Effective, Env) {
    let eff = config::resolve_effective(root, out, reports, results).unwrap_or_else(|e| die(e));
    tracing::debug!(root = %eff.repo_root.display(), output = %eff.output, "resolved settings");
    let env = Env::capture(&eff.repo_root).unwrap_or_else(|e| die(e));
    (eff, env)
}

fn page_client(env: &Env, eff: &Effective, value_var: &str) -> HttpClient {
    let cookie = ConsentCookie::from_env(env, value_var, "BASE_URL");
    if cookie.is_none() {
        tracing::debug!("consent cookie not configured");
    }
    HttpClient::new(cookie.as_ref(), eff.timeout).unwrap_or_else(|e| die(e))
}

fn main() {
    let cli = Cli::parse();
    logger::init_logger(cli.verbose, cli.quiet, cli.no_color);
    if cli.no_color {
        output::disable_colors();
    }

    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Options {
            root,
            output: out,
            sitemap,
        } => {
            let (eff, env) = setup(root.as_deref(), out.as_deref(), None, None);
            let client = page_client(&env, &eff, "COOKIE_VALUE");
            let opts = options::resolve(&env, sitemap, &client).unwrap_or_else(|e| die(e));
            output::print_options(&opts, &eff.output);
        }
        Commands::A11y {
            root,
            results,
            reports,
            output: out,
            sitemap,
        } => {
            let (eff, env) = setup(
                root.as_deref(),
                out.as_deref(),
                reports.as_deref(),
                results.as_deref(),
            );
            let client = page_client(&env, &eff, "COOKIE_VALUE");
            let opts = options::resolve(&env, sitemap, &client).unwrap_or_else(|e| die(e));
            if opts.is_empty() {
                tracing::warn!("no pages configured; set KEY_URL_<n> or TESTFROMSITEMAP");
            }
            let base_url = env.get("BASE_URL").unwrap_or_default();
            let mut scanner = AxeResultsDir::new(&eff.results_dir);
            let audit =
                run_a11y(&opts, base_url, &mut scanner, &eff.tags).unwrap_or_else(|e| die(e));
            report::write_a11y(&eff.reports_dir, &eff.project, &audit)
                .unwrap_or_else(|e| die(e));
            output::print_a11y(&audit, &eff.output);
            if !audit.passed() {
                std::process::exit(1);
            }
        }
        Commands::W3c {
            root,
            reports,
            output: out,
        } => {
            let (eff, env) = setup(root.as_deref(), out.as_deref(), reports.as_deref(), None);
            let urls = target_urls(&env);
            if urls.is_empty() {
                die(QaError::MissingVar("KEY_URLS".to_string()));
            }
            let value_var = if env.flag("COOKIE_VALUE_NONE_ALLOWED") {
                "COOKIE_VALUE_NONE_ALLOWED"
            } else {
                "COOKIE_VALUE"
            };
            let pages = page_client(&env, &eff, value_var);
            let validator = NuValidator::from_env(&env, eff.timeout).unwrap_or_else(|e| die(e));
            tracing::debug!(endpoint = validator.endpoint(), "using html validator");
            let suppressions = Suppressions::compile(&eff.ignore).unwrap_or_else(|e| die(e));
            let run = W3cRun {
                base_url: env.get("BASE_URL").unwrap_or_default(),
                heading_selector: &eff.heading_selector,
                suppressions: &suppressions,
            };
            let audit = run_w3c(&urls, &run, &pages, &validator).unwrap_or_else(|e| die(e));
            report::write_w3c(&eff.reports_dir, &audit).unwrap_or_else(|e| die(e));
            output::print_w3c(&audit, &eff.fail_on, &eff.output);
            if !audit.passed(&eff.fail_on) {
                std::process::exit(1);
            }
        }
        Commands::Base { root, output: out } => {
            let (eff, env) = setup(root.as_deref(), out.as_deref(), None, None);
            let base_url = env.require("BASE_URL").unwrap_or_else(|e| die(e)).to_string();
            let pages = page_client(&env, &eff, "COOKIE_VALUE");
            let res = base::run_base(&base_url, &env, &pages).unwrap_or_else(|e| die(e));
            output::print_base(&res, &eff.output);
            if res.summary.errors > 0 {
                std::process::exit(1);
            }
        }
        Commands::StructuredData { root, output: out } => {
            let (eff, env) = setup(root.as_deref(), out.as_deref(), None, None);
            let base_url = env.require("BASE_URL").unwrap_or_else(|e| die(e)).to_string();
            let pages = page_client(&env, &eff, "COOKIE_VALUE");
            let res = structured::run_structured_data(&base_url, &env, &pages)
                .unwrap_or_else(|e| die(e));
            output::print_base(&res, &eff.output);
            if res.summary.errors > 0 {
                std::process::exit(1);
            }
        }
        Commands::Plan {
            root,
            output: out,
            sitemap,
        } => {
            let (eff, env) = setup(root.as_deref(), out.as_deref(), None, None);
            let client = page_client(&env, &eff, "COOKIE_VALUE");
            let opts = options::resolve(&env, sitemap, &client).unwrap_or_else(|e| die(e));
            let p = plan::build_plan(&opts, &env);
            output::print_plan(&p, &eff.output);
        }
    }
}
