use crate::domain::models::{Actor, Role, Station};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Forbidden,
}

/// Mutating a station is reserved to its creator and to admins.
pub fn check_station_access(actor: &Actor, station: &Station) -> Access {
    if station.created_by == actor.id || actor.role == Role::Admin {
        Access::Allowed
    } else {
        Access::Forbidden
    }
}

#[cfg(test)]
mod tests {
    use super::{Access, check_station_access};
    use crate::domain::models::{Actor, ConnectorType, GeoPoint, Role, Station, StationStatus};

    fn station_created_by(user_id: &str) -> Station {
        Station {
            id: "station-1".to_string(),
            name: "Station A".to_string(),
            location: GeoPoint::new(12.5, 55.6),
            status: StationStatus::Active,
            power_output: 50.0,
            connector_type: ConnectorType::Ccs,
            created_by: user_id.to_string(),
            created_at: "2026-02-20T10:00:00.000Z".to_string(),
            updated_at: "2026-02-20T10:00:00.000Z".to_string(),
        }
    }

    fn actor(id: &str, role: Role) -> Actor {
        Actor {
            id: id.to_string(),
            role,
        }
    }

    #[test]
    fn creator_is_allowed() {
        let station = station_created_by("user-u");
        assert_eq!(
            check_station_access(&actor("user-u", Role::User), &station),
            Access::Allowed
        );
    }

    #[test]
    fn admin_is_allowed_on_foreign_station() {
        let station = station_created_by("user-u");
        assert_eq!(
            check_station_access(&actor("admin-a", Role::Admin), &station),
            Access::Allowed
        );
    }

    #[test]
    fn other_user_is_forbidden() {
        let station = station_created_by("user-u");
        assert_eq!(
            check_station_access(&actor("user-v", Role::User), &station),
            Access::Forbidden
        );
    }
}
