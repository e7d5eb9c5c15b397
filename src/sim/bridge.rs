use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::sim::geometry::Transform;
use crate::sim::map::RoadMap;
use crate::sim::world::{ActorId, Simulator, Snapshot, VehicleControl};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Requests sent to the CARLA bridge, one JSON object per line.
#[derive(Serialize, Debug)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum BridgeRequest<'a> {
    Connect {
        tm_port: u16,
        fixed_delta_seconds: f64,
        synchronous: bool,
        render: bool,
        town: Option<&'a str>,
    },
    SpawnActor {
        blueprint: &'a str,
        transform: Transform,
    },
    DestroyActor {
        id: ActorId,
    },
    ApplyControl {
        id: ActorId,
        control: VehicleControl,
    },
    SetTargetSpeed {
        id: ActorId,
        speed: f64,
    },
    Tick,
    Close,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BridgeResponse {
    Ok {
        #[serde(default)]
        result: serde_json::Value,
    },
    Error {
        message: String,
    },
}

#[derive(Deserialize)]
struct SpawnResult {
    id: ActorId,
}

/// Options forwarded to the bridge during the handshake.
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    pub host: String,
    pub port: u16,
    pub tm_port: u16,
    pub fixed_delta_seconds: f64,
    pub render: bool,
    pub town: Option<String>,
}

/// A simulator living in another process, typically a thin Python bridge in
/// front of the CARLA server.
pub struct BridgeSimulator {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    map: RoadMap,
    snapshot: Snapshot,
}

impl BridgeSimulator {
    pub async fn connect(options: &BridgeOptions) -> Result<Self> {
        let address = format!("{}:{}", options.host, options.port);
        tracing::info!("Connecting to simulator bridge at {}", address);

        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&address))
            .await
            .with_context(|| format!("Timed out connecting to simulator at {address}"))?
            .with_context(|| format!("Failed to connect to simulator at {address}"))?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();

        let mut simulator = Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            map: RoadMap::new("pending", Vec::new())?,
            snapshot: Snapshot::default(),
        };
        simulator.map = simulator
            .call(&BridgeRequest::Connect {
                tm_port: options.tm_port,
                fixed_delta_seconds: options.fixed_delta_seconds,
                synchronous: true,
                render: options.render,
                town: options.town.as_deref(),
            })
            .await
            .context("Simulator handshake failed")?;

        tracing::info!("Connected to simulator, map: {}", simulator.map.name);
        Ok(simulator)
    }

    async fn send(&mut self, request: &BridgeRequest<'_>) -> Result<serde_json::Value> {
        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;

        let mut response = String::new();
        let read = tokio::time::timeout(REQUEST_TIMEOUT, self.reader.read_line(&mut response))
            .await
            .context("Timed out waiting for simulator response")??;
        if read == 0 {
            bail!("Simulator closed the connection");
        }

        match serde_json::from_str::<BridgeResponse>(&response)
            .with_context(|| format!("Malformed simulator response: {}", response.trim_end()))?
        {
            BridgeResponse::Ok { result } => Ok(result),
            BridgeResponse::Error { message } => Err(anyhow!("Simulator error: {message}")),
        }
    }

    async fn call<T: DeserializeOwned>(&mut self, request: &BridgeRequest<'_>) -> Result<T> {
        let result = self.send(request).await?;
        serde_json::from_value(result).with_context(|| format!("Unexpected result for {request:?}"))
    }
}

#[async_trait]
impl Simulator for BridgeSimulator {
    fn map(&self) -> &RoadMap {
        &self.map
    }

    async fn spawn_actor(&mut self, blueprint: &str, transform: Transform) -> Result<ActorId> {
        let spawned: SpawnResult = self
            .call(&BridgeRequest::SpawnActor {
                blueprint,
                transform,
            })
            .await?;
        Ok(spawned.id)
    }

    async fn destroy_actor(&mut self, id: ActorId) -> Result<()> {
        self.send(&BridgeRequest::DestroyActor { id }).await?;
        Ok(())
    }

    async fn apply_control(&mut self, id: ActorId, control: VehicleControl) -> Result<()> {
        self.send(&BridgeRequest::ApplyControl {
            id,
            control: control.clamped(),
        })
        .await?;
        Ok(())
    }

    async fn set_target_speed(&mut self, id: ActorId, speed: f64) -> Result<()> {
        self.send(&BridgeRequest::SetTargetSpeed { id, speed }).await?;
        Ok(())
    }

    async fn tick(&mut self) -> Result<Snapshot> {
        self.snapshot = self.call(&BridgeRequest::Tick).await?;
        Ok(self.snapshot.clone())
    }

    fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    async fn close(&mut self) -> Result<()> {
        self.send(&BridgeRequest::Close).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::geometry::{Location, Rotation};
    use tokio::net::TcpListener;

    /// Serve canned responses, one per request line, and return the requests seen.
    async fn fake_bridge(responses: Vec<String>) -> (u16, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut lines = BufReader::new(read_half).lines();
            let mut requests = Vec::new();
            for response in responses {
                let Some(line) = lines.next_line().await.unwrap() else {
                    break;
                };
                requests.push(line);
                write_half
                    .write_all(format!("{response}\n").as_bytes())
                    .await
                    .unwrap();
            }
            requests
        });
        (port, handle)
    }

    fn options(port: u16) -> BridgeOptions {
        BridgeOptions {
            host: "127.0.0.1".to_string(),
            port,
            tm_port: 8000,
            fixed_delta_seconds: 0.1,
            render: false,
            town: Some("Town05".to_string()),
        }
    }

    fn map_json() -> String {
        serde_json::json!({
            "status": "ok",
            "result": {
                "name": "Town05",
                "lanes": [{
                    "id": 0,
                    "width": 3.5,
                    "centerline": [{"x": 0.0, "y": 0.0}, {"x": 100.0, "y": 0.0}]
                }]
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_handshake_spawn_and_tick() {
        let tick = serde_json::json!({
            "status": "ok",
            "result": {
                "frame": 12,
                "elapsed_seconds": 1.2,
                "actors": {"7": {
                    "id": 7,
                    "transform": {"location": {"x": 1.0, "y": 0.0}, "rotation": {"yaw": 0.0}},
                    "speed": 3.0,
                    "half_length": 2.3,
                    "half_width": 1.0
                }},
                "collisions": []
            }
        });
        let (port, server) = fake_bridge(vec![
            map_json(),
            r#"{"status":"ok","result":{"id":7}}"#.to_string(),
            tick.to_string(),
        ])
        .await;

        let mut sim = BridgeSimulator::connect(&options(port)).await.unwrap();
        assert_eq!(sim.map().name, "Town05");
        assert!((sim.map().lane(0).unwrap().length() - 100.0).abs() < 1e-9);

        let transform = Transform::new(Location::new(1.0, 0.0, 0.0), Rotation::from_yaw(0.0));
        let id = sim.spawn_actor("vehicle.audi.tt", transform).await.unwrap();
        assert_eq!(id, 7);

        let snapshot = sim.tick().await.unwrap();
        assert_eq!(snapshot.frame, 12);
        assert_eq!(snapshot.actor(7).unwrap().speed, 3.0);

        let requests = server.await.unwrap();
        let handshake: serde_json::Value = serde_json::from_str(&requests[0]).unwrap();
        assert_eq!(handshake["method"], "connect");
        assert_eq!(handshake["tm_port"], 8000);
        assert_eq!(handshake["town"], "Town05");
        let spawn: serde_json::Value = serde_json::from_str(&requests[1]).unwrap();
        assert_eq!(spawn["method"], "spawn_actor");
        assert_eq!(spawn["blueprint"], "vehicle.audi.tt");
        assert_eq!(requests[2], r#"{"method":"tick"}"#);
    }

    #[tokio::test]
    async fn test_error_response_is_propagated() {
        let (port, _server) = fake_bridge(vec![
            map_json(),
            r#"{"status":"error","message":"spawn point occupied"}"#.to_string(),
        ])
        .await;

        let mut sim = BridgeSimulator::connect(&options(port)).await.unwrap();
        let err = sim
            .spawn_actor("vehicle.audi.tt", Transform::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("spawn point occupied"));
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        assert!(BridgeSimulator::connect(&options(port)).await.is_err());
    }
}
