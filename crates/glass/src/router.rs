//! Routers: command registry plus execution backend
//!
//! Every dispatch goes through the same steps:
//!
//! received → validated → executed → decorated → returned
//!
//! or stops at rejected. Callers are untrusted, so a rejected or failed
//! dispatch returns only the configured short message; the detail goes to
//! the operator log.

use crate::backend::Backend;
use crate::command::Command;
use crate::error::{GlassError, Result};
use crate::log::CommandLog;
use glass_core::{Messages, Settings};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Per-router view of the process settings
#[derive(Debug, Clone, Default)]
pub struct RouterSettings {
    /// Prefix results with a diagnostic trace
    pub debug: bool,
    /// User-facing messages
    pub messages: Messages,
}

impl From<&Settings> for RouterSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            debug: settings.debug,
            messages: settings.messages.clone(),
        }
    }
}

/// A command that failed during a refresh pass
#[derive(Debug, Clone)]
pub struct RefreshFailure {
    pub index: usize,
    pub command: String,
    pub error: String,
}

/// Outcome of [`Router::refresh`]
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    pub refreshed: usize,
    pub failures: Vec<RefreshFailure>,
}

impl RefreshReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Named registry of commands bound to one execution backend
#[derive(Debug)]
pub struct Router {
    name: String,
    commands: Vec<Arc<dyn Command>>,
    backend: Option<Box<dyn Backend>>,
    settings: RouterSettings,
    log: CommandLog,
    refresh_lock: Mutex<()>,
}

impl Router {
    /// Router without a backend; it can list commands but not run them
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            commands: Vec::new(),
            backend: None,
            settings: RouterSettings::default(),
            log: CommandLog::disabled(),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn with_backend(mut self, backend: impl Backend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    pub fn with_settings(mut self, settings: RouterSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_log(mut self, log: CommandLog) -> Self {
        self.log = log;
        self
    }

    pub fn with_command(mut self, command: impl Command + 'static) -> Self {
        self.commands.push(Arc::new(command));
        self
    }

    /// Append to the registry; insertion order is display order
    pub fn add_command(&mut self, command: Arc<dyn Command>) {
        self.commands.push(command);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands(&self) -> &[Arc<dyn Command>] {
        &self.commands
    }

    pub fn command(&self, index: usize) -> Option<&Arc<dyn Command>> {
        self.commands.get(index)
    }

    pub fn backend(&self) -> Option<&dyn Backend> {
        self.backend.as_deref()
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    pub fn fork_needed(&self) -> bool {
        self.backend.as_ref().map_or(false, |b| b.fork_needed())
    }

    /// Run already built command text on the backend
    pub fn run_raw(&self, command: &str) -> Result<String> {
        match &self.backend {
            Some(backend) => backend.run_raw(command),
            None => Err(GlassError::Configuration(format!(
                "router {} has no execution backend",
                self.name
            ))),
        }
    }

    /// Uniform error payload shown to callers
    pub fn return_error(&self, detail: Option<&str>) -> String {
        match detail {
            Some(detail) => format!(
                "<em>{}: {}</em>",
                self.settings.messages.error_commandrun,
                html_escape::encode_text(detail)
            ),
            None => format!("<em>{}.</em>", self.settings.messages.error_commandrun),
        }
    }

    /// Validate, execute and decorate one command.
    ///
    /// Bad parameters and backend failures come back as `Ok` holding the
    /// uniform error payload. Only configuration errors are returned as `Err`.
    pub fn dispatch(
        &self,
        command: &dyn Command,
        params: &[String],
        helper: Option<&dyn Any>,
    ) -> Result<String> {
        let text = match command.command_text(params) {
            Ok(text) => text,
            Err(GlassError::Configuration(reason)) => return Err(GlassError::Configuration(reason)),
            Err(e) => {
                tracing::warn!(router = %self.name, command = command.name(), error = %e, "rejected dispatch");
                self.log.tagged(
                    e.log_tag(),
                    &format!("Bad params encountered in command {} : {:?}", command.name(), params),
                );
                return Ok(self.return_error(Some(&self.settings.messages.bad_params)));
            }
        };

        let mut response = String::new();
        if self.settings.debug {
            self.log.debug(&format!("Router {} running {:?}", self.name, text));
            response.push_str(&debug_trace(command, params, &text));
        }

        let output = match self.run_raw(&text) {
            Ok(output) => output,
            Err(GlassError::Configuration(reason)) => return Err(GlassError::Configuration(reason)),
            Err(e) => {
                tracing::error!(router = %self.name, command = %text, error = %e, "backend failed");
                self.log.tagged(
                    e.log_tag(),
                    &format!("Router {} failed to run {:?}: {}", self.name, text, e),
                );
                response.push_str(&self.return_error(Some(&self.settings.messages.backend_failure)));
                return Ok(response);
            }
        };

        tracing::info!(router = %self.name, command = %text, bytes = output.len(), "command executed");
        response.push_str(&command.decorate_result(&output, self, helper));
        Ok(response)
    }

    /// Dispatch the command at `index` of the registry
    pub fn dispatch_index(
        &self,
        index: usize,
        params: &[String],
        helper: Option<&dyn Any>,
    ) -> Result<String> {
        match self.commands.get(index) {
            Some(command) => self.dispatch(command.as_ref(), params, helper),
            None => {
                self.log.tagged(
                    "BAD_PARAMS",
                    &format!("Unknown command index {} on router {}", index, self.name),
                );
                Ok(self.return_error(Some(&self.settings.messages.bad_params)))
            }
        }
    }

    /// Let every command recompute its dynamic state, in registry order.
    ///
    /// A failing (or panicking) command is logged and skipped. Refresh passes
    /// on the same router never overlap.
    pub fn refresh(&self) -> RefreshReport {
        let _guard = self.refresh_lock.lock();
        let mut report = RefreshReport::default();

        for (index, command) in self.commands.iter().enumerate() {
            let outcome = catch_unwind(AssertUnwindSafe(|| command.on_refresh(self)));

            let error = match outcome {
                Ok(Ok(())) => {
                    report.refreshed += 1;
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => "refresh hook panicked".to_string(),
            };

            tracing::warn!(router = %self.name, command = command.name(), %error, "refresh failed");
            self.log.tagged(
                "REFRESH_FAILURE",
                &format!("Command {} on router {}: {}", command.name(), self.name, error),
            );
            report.failures.push(RefreshFailure {
                index,
                command: command.name().to_string(),
                error,
            });
        }

        report
    }
}

fn debug_trace(command: &dyn Command, params: &[String], text: &str) -> String {
    let mut trace = format!(
        "<h3>DEBUG</h3><pre>Router.dispatch():\ncommand_name={}\n",
        html_escape::encode_text(command.name())
    );
    for (idx, param) in params.iter().enumerate() {
        trace.push_str(&format!(" param{}={}\n", idx, html_escape::encode_text(param)));
    }
    trace.push_str(&format!(
        "complete command={}\n</pre><hr>",
        html_escape::encode_text(text)
    ));
    trace
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{AnyCommand, OptionProbe, TextCommand};
    use crate::parameter::Parameter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    #[derive(Debug, Default)]
    struct EchoBackend;

    impl Backend for EchoBackend {
        fn run_raw(&self, command: &str) -> Result<String> {
            Ok(format!("ran: {}", command))
        }

        fn describe(&self) -> String {
            "echo".to_string()
        }
    }

    #[derive(Debug)]
    struct FailingBackend;

    impl Backend for FailingBackend {
        fn run_raw(&self, _command: &str) -> Result<String> {
            Err(GlassError::Execution("connection refused by 10.0.0.1:22".to_string()))
        }

        fn fork_needed(&self) -> bool {
            true
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    #[derive(Debug)]
    struct ProtocolsBackend;

    impl Backend for ProtocolsBackend {
        fn run_raw(&self, command: &str) -> Result<String> {
            match command {
                "show protocols" => Ok("peer1 BGP up\npeer2 BGP up\n".to_string()),
                other => Ok(format!("ran: {}", other)),
            }
        }

        fn describe(&self) -> String {
            "protocols".to_string()
        }
    }

    #[derive(Debug, Default)]
    struct CountingCommand {
        refreshed: AtomicUsize,
        fail: bool,
        panic: bool,
    }

    impl Command for CountingCommand {
        fn name(&self) -> &str {
            "counting"
        }

        fn param_specs(&self) -> &[Parameter] {
            &[]
        }

        fn command_text(&self, _params: &[String]) -> Result<String> {
            Ok("true".to_string())
        }

        fn on_refresh(&self, _router: &Router) -> Result<()> {
            self.refreshed.fetch_add(1, Ordering::SeqCst);
            if self.panic {
                panic!("broken hook");
            }
            if self.fail {
                return Err(GlassError::Execution("backend gone".to_string()));
            }
            Ok(())
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn ping() -> TextCommand {
        TextCommand::new("ping -c %s", vec![Parameter::text(r"^\d+$", "count").unwrap()]).unwrap()
    }

    #[test]
    fn test_dispatch_decorates_output() {
        let router = Router::new("rtr1").with_backend(EchoBackend).with_command(ping());

        let result = router.dispatch_index(0, &strings(&["4"]), None).unwrap();
        assert_eq!(result, "<pre>\nran: ping -c 4\n</pre>");
    }

    #[test]
    fn test_bad_params_give_uniform_error_and_log() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("glass.log");
        let router = Router::new("rtr1")
            .with_backend(EchoBackend)
            .with_log(CommandLog::new(&log_path))
            .with_command(ping());

        let result = router.dispatch_index(0, &strings(&["abc"]), None).unwrap();
        assert_eq!(result, "<em>Error while running command: Bad parameters</em>");

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("BAD_PARAMS: Bad params encountered in command ping -c <count>"));
        assert!(log.contains("abc"));
    }

    #[test]
    fn test_execution_failure_hides_internal_error() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("glass.log");
        let router = Router::new("rtr1")
            .with_backend(FailingBackend)
            .with_log(CommandLog::new(&log_path))
            .with_command(ping());

        let result = router.dispatch_index(0, &strings(&["4"]), None).unwrap();
        assert_eq!(result, "<em>Error while running command: Backend is not available</em>");
        assert!(!result.contains("connection refused"));

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("EXECUTION_FAILURE"));
        assert!(log.contains("connection refused"));
        assert!(router.fork_needed());
    }

    #[test]
    fn test_router_without_backend_fails_fast() {
        let router = Router::new("abstract").with_command(ping());

        let err = router.dispatch_index(0, &strings(&["4"]), None).unwrap_err();
        assert!(matches!(err, GlassError::Configuration(_)));
        assert!(!router.fork_needed());
    }

    #[test]
    fn test_unknown_index_is_bad_params() {
        let router = Router::new("rtr1").with_backend(EchoBackend);
        let result = router.dispatch_index(3, &[], None).unwrap();
        assert!(result.contains("Bad parameters"));
    }

    #[test]
    fn test_debug_trace_prefix() {
        let settings = RouterSettings {
            debug: true,
            ..Default::default()
        };
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("glass.log");
        let router = Router::new("rtr1")
            .with_backend(EchoBackend)
            .with_settings(settings)
            .with_log(CommandLog::new(&log_path))
            .with_command(AnyCommand::new().with_prefix("show"));

        let result = router.dispatch_index(0, &strings(&["ip", "route"]), None).unwrap();
        assert!(result.starts_with("<h3>DEBUG</h3><pre>Router.dispatch():\ncommand_name=Any command\n"));
        assert!(result.contains(" param0=ip\n param1=route\n"));
        assert!(result.contains("complete command=show ip route\n</pre><hr>"));
        assert!(result.ends_with("<pre>\nran: show ip route\n</pre>"));

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("DEBUG:Router rtr1 running \"show ip route\""));
    }

    #[test]
    fn test_custom_messages() {
        let settings = RouterSettings {
            debug: false,
            messages: Messages {
                error_commandrun: "Failed".to_string(),
                bad_params: "check your input".to_string(),
                backend_failure: "try later".to_string(),
            },
        };
        let router = Router::new("rtr1").with_backend(FailingBackend).with_settings(settings);

        assert_eq!(router.return_error(None), "<em>Failed.</em>");
        assert_eq!(router.dispatch_index(9, &[], None).unwrap(), "<em>Failed: check your input</em>");
    }

    #[test]
    fn test_refresh_isolates_failures() {
        let first = Arc::new(CountingCommand::default());
        let broken = Arc::new(CountingCommand {
            fail: true,
            ..Default::default()
        });
        let panicking = Arc::new(CountingCommand {
            panic: true,
            ..Default::default()
        });
        let last = Arc::new(CountingCommand::default());

        let mut router = Router::new("rtr1").with_backend(EchoBackend);
        router.add_command(first.clone());
        router.add_command(broken.clone());
        router.add_command(panicking.clone());
        router.add_command(last.clone());

        let report = router.refresh();

        assert_eq!(report.refreshed, 2);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(report.failures[1].index, 2);
        assert_eq!(last.refreshed.load(Ordering::SeqCst), 1);
        assert_eq!(broken.refreshed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_refresh_updates_probed_options() {
        let peers = Parameter::selection(&[vec!["placeholder"]], "peer").unwrap();
        let cmd = TextCommand::new("show route protocol %s", vec![peers])
            .unwrap()
            .with_probe(OptionProbe::new(0, "show protocols", r"^(\S+)\s+BGP").unwrap())
            .unwrap();
        let router = Router::new("bird").with_backend(ProtocolsBackend).with_command(cmd);

        let before = router.dispatch_index(0, &strings(&["peer2"]), None).unwrap();
        assert!(before.contains("Bad parameters"));

        assert!(router.refresh().is_clean());

        let after = router.dispatch_index(0, &strings(&["peer2"]), None).unwrap();
        assert_eq!(after, "<pre>\nran: show route protocol peer2\n</pre>");
        assert_eq!(router.commands()[0].param_specs()[0].default_value(), "peer1");
    }

    #[test]
    fn test_failed_probe_keeps_old_options() {
        let peers = Parameter::selection(&[vec!["peer0"]], "peer").unwrap();
        let cmd = TextCommand::new("show route protocol %s", vec![peers])
            .unwrap()
            .with_probe(OptionProbe::new(0, "show protocols", r"^(\S+)\s+OSPF").unwrap())
            .unwrap();
        let router = Router::new("bird").with_backend(ProtocolsBackend).with_command(cmd);

        let report = router.refresh();
        assert_eq!(report.failures.len(), 1);
        assert!(router.commands()[0].param_specs()[0].validate("peer0"));
    }

    #[test]
    fn test_concurrent_dispatch_during_refresh() {
        let peers = Parameter::selection(&[vec!["peer1"]], "peer").unwrap();
        let cmd = TextCommand::new("show route protocol %s", vec![peers])
            .unwrap()
            .with_probe(OptionProbe::new(0, "show protocols", r"^(\S+)\s+BGP").unwrap())
            .unwrap();
        let router = Arc::new(Router::new("bird").with_backend(ProtocolsBackend).with_command(cmd));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let router = Arc::clone(&router);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let result = router.dispatch_index(0, &strings(&["peer1"]), None).unwrap();
                        assert_eq!(result, "<pre>\nran: show route protocol peer1\n</pre>");
                    }
                })
            })
            .collect();

        for _ in 0..20 {
            assert!(router.refresh().is_clean());
        }
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
