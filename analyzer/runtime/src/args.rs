use crate::{
    core::{Config, ReportStore, DEFAULT_CONTROLLER_CLASS, DEFAULT_INGRESS_CLASS},
    http,
    index::{Index, NamespaceIndex, SharedIndex},
    stats, Analyzer, Metrics,
};
use anyhow::{bail, Result};
use clap::{CommandFactory, FromArgMatches, Parser};
use k8s_openapi::api::networking::v1 as networking;
use kube::runtime::watcher;
use prometheus_client::registry::Registry;
use std::{net::SocketAddr, sync::Arc};
use tokio::time::{self, Duration};
use tracing::{info, info_span, warn, Instrument};

// The report server listens on the port kubert's admin server otherwise defaults to.
const DEFAULT_ADMIN_ADDR: &str = "0.0.0.0:9990";

#[derive(Debug, Parser)]
#[clap(
    name = "ingress-analyzer",
    about = "Analyzes NGINX Ingresses to build a migration report",
    version
)]
pub struct Args {
    #[clap(
        long,
        default_value = "ingress_analyzer=info,warn",
        env = "INGRESS_ANALYZER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Address on which the migration report is served.
    #[clap(long, env = "ADDR", default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    /// Namespaces to analyze. When empty, all namespaces are analyzed.
    #[clap(long, env = "NAMESPACES", value_delimiter = ',')]
    namespaces: Vec<String>,

    /// Name of the ingress class this controller satisfies.
    #[clap(long, env = "INGRESS_CLASS", default_value = DEFAULT_INGRESS_CLASS)]
    ingress_class: String,

    /// Ingress controller class to analyze.
    #[clap(long, env = "CONTROLLER_CLASS", default_value = DEFAULT_CONTROLLER_CLASS)]
    controller_class: String,

    /// Also analyzes ingresses without an ingress class or class annotation.
    #[clap(long, env = "WATCH_INGRESS_WITHOUT_CLASS")]
    watch_ingress_without_class: bool,

    /// Matches the ingress class by name as well as by controller.
    #[clap(long, env = "INGRESS_CLASS_BY_NAME")]
    ingress_class_by_name: bool,

    #[clap(long, default_value = "300")]
    refresh_interval_secs: u64,

    #[clap(long, default_value = "5000")]
    cache_sync_timeout_ms: u64,

    #[clap(flatten)]
    stats: stats::Args,
}

impl Args {
    pub async fn parse_and_run() -> Result<()> {
        Self::from_arg_matches(&Self::command_with_defaults().get_matches())?
            .run()
            .await
    }

    fn command_with_defaults() -> clap::Command {
        Self::command().mut_arg("admin_addr", |arg| arg.default_value(DEFAULT_ADMIN_ADDR))
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            client,
            admin,
            addr,
            namespaces,
            ingress_class,
            controller_class,
            watch_ingress_without_class,
            ingress_class_by_name,
            refresh_interval_secs,
            cache_sync_timeout_ms,
            stats,
        } = self;

        let config = Arc::new(Config {
            controller_class,
            ingress_class,
            ingress_class_by_name,
            watch_ingress_without_class,
            namespaces: namespaces.into_iter().filter(|ns| !ns.is_empty()).collect(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        });
        let stats = Arc::new(stats::Client::from_args(&stats)?);

        let index = Index::shared(config.clone());
        let store = ReportStore::shared(config.clone());

        let mut prom = <Registry>::default();
        let metrics = Metrics::register(prom.sub_registry_with_prefix("ingress_analyzer"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let mut runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        // Spawn resource watches.

        let classes = runtime.watch_all::<networking::IngressClass>(watcher::Config::default());
        tokio::spawn(
            kubert::index::cluster(index.clone(), classes).instrument(info_span!("ingressclasses")),
        );

        if config.namespaces.is_empty() {
            let ingresses = runtime.watch_all::<networking::Ingress>(watcher::Config::default());
            tokio::spawn(
                kubert::index::namespaced(index.clone(), ingresses)
                    .instrument(info_span!("ingresses")),
            );
        } else {
            // Namespace-scoped RBAC may not permit a cluster-wide list.
            for ns in &config.namespaces {
                let ingresses = runtime
                    .watch_namespaced::<networking::Ingress>(ns.clone(), watcher::Config::default());
                tokio::spawn(
                    kubert::index::namespaced(NamespaceIndex::shared(index.clone(), ns), ingresses)
                        .instrument(info_span!("ingresses", %ns)),
                );
            }
        }

        wait_for_sync(&index, Duration::from_millis(cache_sync_timeout_ms)).await;

        let analyzer = Analyzer {
            store,
            index,
            stats,
            metrics,
        };
        analyzer.try_refresh();

        tokio::spawn(
            refresh(
                analyzer.clone(),
                Duration::from_secs(refresh_interval_secs),
                runtime.shutdown_handle(),
            )
            .instrument(info_span!("refresh")),
        );

        // Run the report server, serving the store's latest report.
        tokio::spawn(http::serve(
            addr,
            http::ReportServer::new(analyzer),
            runtime.shutdown_handle(),
        ));
        info!(
            endpoint = %format!("http://{}", browse_addr(addr)),
            config.namespaces = ?config.namespaces,
            "Serving the Ingress NGINX migration report"
        );

        // Block the main thread on the shutdown signal. Once it fires, wait for the background tasks to
        // complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}

/// Waits for the index's initial listings to complete.
///
/// Timing out is not fatal: refreshes fail until the index syncs.
async fn wait_for_sync(index: &SharedIndex, timeout: Duration) {
    let mut synced = index.read().synced_rx();
    match time::timeout(timeout, synced.wait_for(|synced| *synced)).await {
        Ok(Ok(_)) => info!("Ingress caches synced"),
        Ok(Err(_)) => warn!("Index closed before its caches synced"),
        Err(_) => warn!(?timeout, "Timed out waiting for ingress caches to sync"),
    };
}

async fn refresh(analyzer: Analyzer, interval: Duration, drain: drain::Watch) {
    let mut timer = time::interval_at(time::Instant::now() + interval, interval);
    timer.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    let shutdown = drain.signaled();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = timer.tick() => analyzer.try_refresh(),
            _handle = &mut shutdown => return,
        }
    }
}

/// Returns the address operators browse to reach the report.
fn browse_addr(addr: SocketAddr) -> String {
    if addr.ip().is_unspecified() {
        format!("localhost:{}", addr.port())
    } else {
        addr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults() {
        let args = Args::try_parse_from(["ingress-analyzer"]).expect("defaults must parse");
        assert_eq!(args.addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(args.ingress_class, "nginx");
        assert_eq!(args.controller_class, "k8s.io/ingress-nginx");
        assert!(args.namespaces.is_empty());
        assert!(!args.watch_ingress_without_class);
        assert!(!args.ingress_class_by_name);
        assert_eq!(args.refresh_interval_secs, 300);
        assert_eq!(args.stats.endpoint(), stats::DEFAULT_ENDPOINT);
    }

    #[test]
    fn admin_server_avoids_report_port() {
        let matches = Args::command_with_defaults()
            .try_get_matches_from(["ingress-analyzer"])
            .expect("defaults must parse");
        let args = Args::from_arg_matches(&matches).expect("args must build");
        assert_eq!(
            args.admin.admin_addr,
            DEFAULT_ADMIN_ADDR.parse::<SocketAddr>().unwrap()
        );
        assert_ne!(args.admin.admin_addr, args.addr);

        let matches = Args::command_with_defaults()
            .try_get_matches_from(["ingress-analyzer", "--admin-addr=127.0.0.1:9000"])
            .expect("args must parse");
        let args = Args::from_arg_matches(&matches).expect("args must build");
        assert_eq!(
            args.admin.admin_addr,
            "127.0.0.1:9000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn parses_namespace_list() {
        let args = Args::try_parse_from([
            "ingress-analyzer",
            "--namespaces=ns-0,ns-1",
            "--watch-ingress-without-class",
            "--ingress-class-by-name",
            "--ingress-class=internal",
        ])
        .expect("args must parse");
        assert_eq!(args.namespaces, vec!["ns-0", "ns-1"]);
        assert!(args.watch_ingress_without_class);
        assert!(args.ingress_class_by_name);
        assert_eq!(args.ingress_class, "internal");
    }

    #[test]
    fn browse_addr_uses_localhost() {
        assert_eq!(
            browse_addr("0.0.0.0:8080".parse().unwrap()),
            "localhost:8080"
        );
        assert_eq!(
            browse_addr("10.0.0.1:8080".parse().unwrap()),
            "10.0.0.1:8080"
        );
    }
}
