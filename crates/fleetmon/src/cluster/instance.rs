use chrono::NaiveDateTime;
use serde::Serialize;

const LAUNCH_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Launch time of an instance as reported by the cloud provider.
/// Some code paths only know a preformatted string, which is passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchTime {
    Time(NaiveDateTime),
    Raw(String),
}

impl LaunchTime {
    pub fn render(&self) -> String {
        match self {
            LaunchTime::Time(time) => time.format(LAUNCH_TIME_FORMAT).to_string(),
            LaunchTime::Raw(value) => value.clone(),
        }
    }
}

impl From<NaiveDateTime> for LaunchTime {
    fn from(time: NaiveDateTime) -> Self {
        LaunchTime::Time(time)
    }
}

impl From<&str> for LaunchTime {
    fn from(value: &str) -> Self {
        LaunchTime::Raw(value.to_string())
    }
}

/// Cloud instance backing a scheduler node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    pub id: String,
    pub private_ip: String,
    pub hostname: String,
    pub launch_time: LaunchTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct InstanceDescription {
    pub id: String,
    pub private_ip: String,
    pub hostname: String,
    pub launch_time: String,
}

impl InstanceRecord {
    pub fn new(
        id: impl Into<String>,
        private_ip: impl Into<String>,
        hostname: impl Into<String>,
        launch_time: impl Into<LaunchTime>,
    ) -> Self {
        Self {
            id: id.into(),
            private_ip: private_ip.into(),
            hostname: hostname.into(),
            launch_time: launch_time.into(),
        }
    }

    pub fn description(&self) -> InstanceDescription {
        InstanceDescription {
            id: self.id.clone(),
            private_ip: self.private_ip.clone(),
            hostname: self.hostname.clone(),
            launch_time: self.launch_time.render(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_description_with_time() {
        let time = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let instance = InstanceRecord::new("id-1", "ip-1", "hostname", time);
        assert_eq!(
            serde_json::to_value(instance.description()).unwrap(),
            json!({
                "id": "id-1",
                "private-ip": "ip-1",
                "hostname": "hostname",
                "launch-time": "2020-01-01 00:00:00",
            })
        );
    }

    #[test]
    fn test_description_with_raw_time() {
        let instance = InstanceRecord::new("id-2", "ip-2", "hostname", "some_launch_time");
        assert_eq!(instance.description().launch_time, "some_launch_time");
    }
}
