//! BDD harness running the Gauntlet step library against mock services
//!
//! The mock API and mock SOAP service are spawned once; their addresses are
//! injected into every scenario's variable store as `MOCK_HOST` and
//! `SOAP_WSDL`, so the feature files reach them through `${...}`
//! interpolation like any other saved variable.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use cucumber::{then, World as _};
use futures::FutureExt as _;

use gauntlet_steps::{hooks, GauntletWorld};

static MOCK_HOST: OnceLock<String> = OnceLock::new();
static SOAP_WSDL: OnceLock<String> = OnceLock::new();

mod mock {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    #[derive(Clone, Default)]
    struct RestState {
        status_calls: Arc<AtomicUsize>,
    }

    async fn user() -> Json<serde_json::Value> {
        Json(json!({"name": "alice", "roles": ["admin", "qa"]}))
    }

    async fn greet(Path(name): Path<String>) -> String {
        format!("hello {name}")
    }

    async fn status(State(state): State<RestState>) -> String {
        let call = state.status_calls.fetch_add(1, Ordering::SeqCst);
        if call < 3 {
            "PENDING".to_string()
        } else {
            "READY".to_string()
        }
    }

    async fn echo_headers(headers: HeaderMap) -> Json<serde_json::Value> {
        let token = headers
            .get("x-token")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        Json(json!({"x-token": token}))
    }

    async fn echo_body(body: String) -> String {
        body
    }

    async fn login(headers: HeaderMap) -> impl IntoResponse {
        // qa:secret
        let authorized = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            == Some("Basic cWE6c2VjcmV0");
        if authorized {
            (StatusCode::OK, "welcome")
        } else {
            (StatusCode::UNAUTHORIZED, "who are you?")
        }
    }

    async fn session() -> impl IntoResponse {
        (
            [(header::SET_COOKIE, "session=abc123; Path=/")],
            "session granted",
        )
    }

    pub async fn spawn_rest() -> anyhow::Result<SocketAddr> {
        let app = Router::new()
            .route("/users/{id}", get(user))
            .route("/greet/{name}", get(greet))
            .route("/status", get(status))
            .route("/echo/headers", get(echo_headers))
            .route("/echo/body", post(echo_body))
            .route("/login", get(login))
            .route("/session", get(session))
            .with_state(RestState::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve mock API");
        });
        Ok(addr)
    }

    #[derive(Clone)]
    struct SoapState {
        base_url: String,
    }

    async fn wsdl(State(state): State<SoapState>) -> ([(&'static str, &'static str); 1], String) {
        let body = format!(
            r#"<?xml version="1.0"?>
<definitions name="Calculator"
    targetNamespace="http://example.com/calc"
    xmlns="http://schemas.xmlsoap.org/wsdl/"
    xmlns:tns="http://example.com/calc"
    xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/">
  <binding name="CalculatorBinding" type="tns:CalculatorPortType">
    <soap:binding style="document" transport="http://schemas.xmlsoap.org/soap/http"/>
    <operation name="Add">
      <soap:operation soapAction="http://example.com/calc/Add"/>
    </operation>
    <operation name="Divide">
      <soap:operation soapAction="http://example.com/calc/Divide"/>
    </operation>
  </binding>
  <service name="CalculatorService">
    <port name="CalculatorPort" binding="tns:CalculatorBinding">
      <soap:address location="{base}/calc"/>
    </port>
  </service>
</definitions>"#,
            base = state.base_url
        );
        ([("content-type", "text/xml; charset=utf-8")], body)
    }

    fn fault_envelope(reason: &str) -> String {
        format!(
            r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body><soapenv:Fault><faultcode>soapenv:Server</faultcode><faultstring>{reason}</faultstring></soapenv:Fault></soapenv:Body></soapenv:Envelope>"#
        )
    }

    fn result_envelope(tag: &str, value: i64) -> String {
        format!(
            r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body><{tag} xmlns="http://example.com/calc">{value}</{tag}></soapenv:Body></soapenv:Envelope>"#
        )
    }

    async fn calc(headers: HeaderMap, body: String) -> impl IntoResponse {
        let action = headers
            .get("soapaction")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let operation = match action {
            "\"http://example.com/calc/Add\"" => "Add",
            "\"http://example.com/calc/Divide\"" => "Divide",
            _ => {
                return (
                    StatusCode::BAD_REQUEST,
                    [("content-type", "text/xml; charset=utf-8")],
                    fault_envelope("missing or unknown SOAPAction"),
                )
            }
        };

        let a: i64 = gauntlet_soap::read_element(&body, "a")
            .ok()
            .flatten()
            .and_then(|text| text.parse().ok())
            .unwrap_or(0);
        let b: i64 = gauntlet_soap::read_element(&body, "b")
            .ok()
            .flatten()
            .and_then(|text| text.parse().ok())
            .unwrap_or(0);

        match operation {
            "Add" => (
                StatusCode::OK,
                [("content-type", "text/xml; charset=utf-8")],
                result_envelope("AddResult", a + b),
            ),
            _ if b == 0 => (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/xml; charset=utf-8")],
                fault_envelope("division by zero"),
            ),
            _ => (
                StatusCode::OK,
                [("content-type", "text/xml; charset=utf-8")],
                result_envelope("DivideResult", a / b),
            ),
        }
    }

    pub async fn spawn_soap() -> anyhow::Result<String> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let base_url = format!("http://{addr}");
        let app = Router::new()
            .route("/calc", post(calc))
            .route("/calc/wsdl", get(wsdl))
            .with_state(SoapState {
                base_url: base_url.clone(),
            });
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve mock SOAP");
        });
        Ok(format!("{base_url}/calc/wsdl"))
    }
}

#[then(expr = "the last poll must have taken between {int} and {int} seconds")]
async fn then_last_poll_bounds(world: &mut GauntletWorld, min: u64, max: u64) {
    let report = world.last_poll.as_ref().expect("no poll ran in this scenario");
    let secs = report.elapsed.as_secs();
    assert!(
        secs >= min && secs <= max,
        "expected the poll to take between {min}s and {max}s, took {secs}s over {} attempts",
        report.attempts
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let rest_addr = mock::spawn_rest().await?;
    let _ = MOCK_HOST.set(format!("127.0.0.1:{}", rest_addr.port()));
    let _ = SOAP_WSDL.set(mock::spawn_soap().await?);

    GauntletWorld::cucumber()
        .before(|_feature, _rule, scenario, world| {
            async move {
                hooks::scenario_setup(scenario, world).await;
                if let Some(host) = MOCK_HOST.get() {
                    world.ctx.vars.set("MOCK_HOST", host.clone());
                }
                if let Some(wsdl) = SOAP_WSDL.get() {
                    world.ctx.vars.set("SOAP_WSDL", wsdl.clone());
                }
            }
            .boxed_local()
        })
        .after(|_feature, _rule, _scenario, _event, world| {
            async move {
                if let Some(world) = world {
                    hooks::scenario_teardown(world).await;
                }
            }
            .boxed_local()
        })
        .run_and_exit("tests/features")
        .await;

    Ok(())
}
