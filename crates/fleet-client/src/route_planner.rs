//! Route planner for the optimal-route screen.
//!
//! Holds the device directory snapshot, the selected device and the last
//! rendered set of alternatives. Planning decodes every alternative the
//! backend returns and derives its fuel estimate, length and bounds.

use crate::devices::fetch_devices;
use crate::error::{ClientError, PlanError};
use crate::transport::{Accept, Transport};
use fleet_core::{enrich_route, BoundingBox, Device, DeviceId, LatLng, PlannedRoute, RawRoute};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PlannerState {
    #[default]
    Idle,
    Loading,
    Rendered,
    Failed(String),
}

pub struct RoutePlanner<T> {
    transport: T,
    devices: Vec<Device>,
    selected_device: Option<DeviceId>,
    map_ready: bool,
    state: PlannerState,
    routes: Vec<PlannedRoute>,
    selected_route: Option<usize>,
}

impl<T: Transport> RoutePlanner<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            devices: Vec::new(),
            selected_device: None,
            map_ready: false,
            state: PlannerState::Idle,
            routes: Vec::new(),
            selected_route: None,
        }
    }

    /// Refresh the device snapshot from the directory.
    pub async fn load_devices(&mut self) -> Result<&[Device], ClientError> {
        self.devices = fetch_devices(&self.transport).await?;
        Ok(&self.devices)
    }

    pub fn set_devices(&mut self, devices: Vec<Device>) {
        self.devices = devices;
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Select a device and return its marker position. Planned routes stay as they are.
    pub fn select_device(&mut self, device_id: DeviceId) -> Result<Option<LatLng>, PlanError> {
        let device = self.device(device_id)?;
        let position = device.position;
        self.selected_device = Some(device_id);
        Ok(position)
    }

    pub fn selected_device(&self) -> Option<&Device> {
        let id = self.selected_device?;
        self.devices.iter().find(|device| device.id == id)
    }

    pub fn set_map_ready(&mut self, ready: bool) {
        self.map_ready = ready;
    }

    pub fn state(&self) -> &PlannerState {
        &self.state
    }

    pub fn routes(&self) -> &[PlannedRoute] {
        &self.routes
    }

    pub fn select_route(&mut self, index: usize) -> Option<&PlannedRoute> {
        let route = self.routes.get(index)?;
        self.selected_route = Some(index);
        Some(route)
    }

    pub fn selected_route(&self) -> Option<&PlannedRoute> {
        self.routes.get(self.selected_route?)
    }

    /// Box covering every rendered alternative.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.routes
            .iter()
            .filter_map(|route| route.bounds)
            .reduce(|acc, bounds| acc.union(&bounds))
    }

    fn device(&self, device_id: DeviceId) -> Result<&Device, PlanError> {
        self.devices
            .iter()
            .find(|device| device.id == device_id)
            .ok_or(PlanError::UnknownDevice(device_id))
    }

    /// Request alternatives from `start` to `end` for a device.
    ///
    /// Refused without any request when a place is blank, the map is not
    /// ready, or the device is unknown or has no position. On failure the
    /// previously rendered routes are kept.
    pub async fn plan_routes(
        &mut self,
        device_id: DeviceId,
        start: &str,
        end: &str,
    ) -> Result<&[PlannedRoute], PlanError> {
        let (start, end) = (start.trim(), end.trim());
        if start.is_empty() || end.is_empty() {
            return Err(PlanError::EmptyPlace);
        }
        if !self.map_ready {
            return Err(PlanError::MapNotReady);
        }
        let device = self.device(device_id)?;
        if device.position.is_none() {
            return Err(PlanError::NoPosition(device_id));
        }
        let consumption_rate = device.fuel_consumption_rate;

        self.state = PlannerState::Loading;
        let query = vec![
            ("deviceId".to_string(), device_id.to_string()),
            ("start".to_string(), start.to_string()),
            ("end".to_string(), end.to_string()),
        ];

        match self.fetch_routes(&query, consumption_rate).await {
            Ok(routes) => {
                tracing::info!(device_id, alternatives = routes.len(), "routes planned");
                self.selected_route = (!routes.is_empty()).then_some(0);
                self.routes = routes;
                self.state = PlannerState::Rendered;
                Ok(&self.routes)
            }
            Err(err) => {
                let message = err.user_message();
                tracing::warn!(device_id, error = %message, "route planning failed");
                self.state = PlannerState::Failed(message);
                Err(err.into())
            }
        }
    }

    async fn fetch_routes(
        &self,
        query: &[(String, String)],
        consumption_rate: Option<f64>,
    ) -> Result<Vec<PlannedRoute>, ClientError> {
        let response = self
            .transport
            .get("/api/route", query, Accept::Json)
            .await?
            .error_for_status()?;

        let body: Value = response.json()?;
        let items = match body {
            Value::Array(items) => items,
            Value::Object(mut object) => match object.remove("routes") {
                Some(Value::Array(items)) => items,
                _ => return Err(ClientError::Payload("expected a list of routes".to_string())),
            },
            Value::Null => Vec::new(),
            _ => return Err(ClientError::Payload("expected a list of routes".to_string())),
        };

        let mut routes = Vec::with_capacity(items.len());
        for item in items {
            let raw: RawRoute = match serde_json::from_value(item) {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable route");
                    continue;
                }
            };
            match enrich_route(raw, consumption_rate) {
                Ok(route) => routes.push(route),
                Err(err) => tracing::warn!(error = %err, "skipping route"),
            }
        }
        Ok(routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::tests::FakeTransport;
    use crate::transport::{HttpResponse, TransportError};
    use fleet_core::{DeviceStatus, FuelEstimate, RouteType};

    const REFERENCE_PATH: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    fn truck(rate: Option<f64>) -> Device {
        Device {
            id: 1,
            name: "Truck 1".to_string(),
            position: Some(LatLng::new(38.5, -120.2)),
            status: DeviceStatus::Online,
            fuel_consumption_rate: rate,
        }
    }

    fn planner(responses: Vec<Result<HttpResponse, TransportError>>, device: Device) -> RoutePlanner<FakeTransport> {
        let mut planner = RoutePlanner::new(FakeTransport::with(responses));
        planner.set_devices(vec![device]);
        planner.set_map_ready(true);
        planner
    }

    fn routes_body() -> String {
        serde_json::json!([
            {"routeType": "FASTEST", "distanceKm": 100.0, "durationMin": 80.0, "polyline": REFERENCE_PATH},
            {"routeType": "shortest", "distanceKm": 90.0, "durationMin": 95.0, "encodedPath": "_p~iF~ps|U"},
            {"routeType": "fuel_optimal", "distanceKm": 95.0, "durationMin": 90.0, "polyline": "_p~iF~ps|"}
        ])
        .to_string()
    }

    #[tokio::test]
    async fn plans_and_enriches_alternatives() {
        let mut planner = planner(vec![Ok(HttpResponse::new(200, routes_body()))], truck(Some(8.0)));

        let routes = planner.plan_routes(1, "Depot", "Harbour").await.unwrap();

        // the truncated fuel-optimal path is dropped
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].alternative.route_type, RouteType::Fastest);
        assert_eq!(routes[0].alternative.estimated_fuel_liters, FuelEstimate::Liters(8.0));
        assert_eq!(routes[0].alternative.estimated_fuel_liters.to_string(), "8.00");
        assert_eq!(routes[0].path.len(), 3);
        assert_eq!(routes[1].alternative.route_type, RouteType::Shortest);
        assert_eq!(routes[1].color, RouteType::Shortest.color());
        assert_eq!(planner.state(), &PlannerState::Rendered);
        assert_eq!(planner.selected_route().unwrap().alternative.route_type, RouteType::Fastest);

        let bounds = planner.bounds().unwrap();
        assert_eq!(bounds.south_west, LatLng::new(38.5, -126.453));
        assert_eq!(bounds.north_east, LatLng::new(43.252, -120.2));

        let request = &planner.transport.requests()[0];
        assert_eq!(request.path, "/api/route");
        assert_eq!(
            request.query,
            vec![
                ("deviceId".to_string(), "1".to_string()),
                ("start".to_string(), "Depot".to_string()),
                ("end".to_string(), "Harbour".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn unknown_consumption_rate_gives_not_available() {
        let mut planner = planner(vec![Ok(HttpResponse::new(200, routes_body()))], truck(None));

        let routes = planner.plan_routes(1, "Depot", "Harbour").await.unwrap();

        assert_eq!(routes[0].alternative.estimated_fuel_liters.to_string(), "N/A");
    }

    #[tokio::test]
    async fn refuses_without_request() {
        let mut planner = planner(vec![], truck(Some(8.0)));

        assert!(matches!(planner.plan_routes(1, "  ", "Harbour").await, Err(PlanError::EmptyPlace)));
        assert!(matches!(planner.plan_routes(9, "Depot", "Harbour").await, Err(PlanError::UnknownDevice(9))));

        planner.set_devices(vec![Device {
            position: None,
            ..truck(Some(8.0))
        }]);
        assert!(matches!(planner.plan_routes(1, "Depot", "Harbour").await, Err(PlanError::NoPosition(1))));

        planner.set_map_ready(false);
        assert!(matches!(planner.plan_routes(1, "Depot", "Harbour").await, Err(PlanError::MapNotReady)));

        assert!(planner.transport.requests().is_empty());
        assert_eq!(planner.state(), &PlannerState::Idle);
    }

    #[tokio::test]
    async fn failure_keeps_previous_routes() {
        let mut planner = planner(
            vec![
                Ok(HttpResponse::new(200, routes_body())),
                Ok(HttpResponse::new(502, r#"{"message":"routing engine unavailable"}"#)),
            ],
            truck(Some(8.0)),
        );

        planner.plan_routes(1, "Depot", "Harbour").await.unwrap();
        let err = planner.plan_routes(1, "Depot", "Airport").await.unwrap_err();

        assert_eq!(err.to_string(), "routing engine unavailable");
        assert_eq!(
            planner.state(),
            &PlannerState::Failed("routing engine unavailable".to_string())
        );
        assert_eq!(planner.routes().len(), 2);
    }

    #[tokio::test]
    async fn selecting_a_device_leaves_routes_alone() {
        let mut planner = planner(vec![Ok(HttpResponse::new(200, routes_body()))], truck(Some(8.0)));
        planner.plan_routes(1, "Depot", "Harbour").await.unwrap();

        let marker = planner.select_device(1).unwrap();

        assert_eq!(marker, Some(LatLng::new(38.5, -120.2)));
        assert_eq!(planner.selected_device().unwrap().name, "Truck 1");
        assert_eq!(planner.routes().len(), 2);
        assert!(matches!(planner.select_device(5), Err(PlanError::UnknownDevice(5))));
    }

    #[tokio::test]
    async fn select_route_tracks_index() {
        let mut planner = planner(vec![Ok(HttpResponse::new(200, routes_body()))], truck(Some(8.0)));
        planner.plan_routes(1, "Depot", "Harbour").await.unwrap();

        assert!(planner.select_route(1).is_some());
        assert_eq!(planner.selected_route().unwrap().alternative.route_type, RouteType::Shortest);
        assert!(planner.select_route(7).is_none());
        assert_eq!(planner.selected_route().unwrap().alternative.route_type, RouteType::Shortest);
    }

    #[tokio::test]
    async fn loads_devices_from_directory() {
        let mut planner = RoutePlanner::new(FakeTransport::with(vec![Ok(HttpResponse::new(
            200,
            r#"[{"id":4,"name":"Bus","position":{"lat":1.0,"lng":2.0}}]"#,
        ))]));

        let devices = planner.load_devices().await.unwrap();

        assert_eq!(devices.len(), 1);
        assert_eq!(planner.select_device(4).unwrap(), Some(LatLng::new(1.0, 2.0)));
    }
}
