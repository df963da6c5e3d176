use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A business report served by the mock API.
///
/// The metrics in `data` vary by report type, so they stay a loose JSON
/// object rather than a typed struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub title: String,
    pub date: String,
    #[serde(rename = "type")]
    pub report_type: String,
    pub status: String,
    pub data: Value,
}

/// Response shape of `GET /reports`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsResponse {
    pub reports: Vec<Report>,
}

/// Response shape of `GET /reports/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    pub report: Report,
}

/// Sample report data served by the mock transport.
pub fn sample_reports() -> Vec<Report> {
    vec![
        Report {
            id: "1".to_string(),
            title: "Monthly Sales Report".to_string(),
            date: "2023-10-15".to_string(),
            report_type: "Sales".to_string(),
            status: "Completed".to_string(),
            data: json!({
                "totalSales": 12850,
                "totalOrders": 345,
                "averageOrderValue": 37.24,
                "topProduct": "Premium Subscription"
            }),
        },
        Report {
            id: "2".to_string(),
            title: "Customer Acquisition".to_string(),
            date: "2023-10-10".to_string(),
            report_type: "Marketing".to_string(),
            status: "Completed".to_string(),
            data: json!({
                "newCustomers": 127,
                "conversionRate": 3.2,
                "costPerAcquisition": 24.15,
                "topChannel": "Organic Search"
            }),
        },
        Report {
            id: "3".to_string(),
            title: "Inventory Status".to_string(),
            date: "2023-10-14".to_string(),
            report_type: "Inventory".to_string(),
            status: "Pending".to_string(),
            data: json!({
                "totalItems": 1253,
                "lowStockItems": 32,
                "outOfStockItems": 15,
                "restockValue": 4350
            }),
        },
        Report {
            id: "4".to_string(),
            title: "Website Performance".to_string(),
            date: "2023-10-12".to_string(),
            report_type: "Technical".to_string(),
            status: "Completed".to_string(),
            data: json!({
                "averageLoadTime": 1.2,
                "bounceRate": 28.5,
                "mobileUsers": 68.3,
                "desktopUsers": 31.7
            }),
        },
        Report {
            id: "5".to_string(),
            title: "Customer Satisfaction".to_string(),
            date: "2023-10-08".to_string(),
            report_type: "Customer".to_string(),
            status: "Completed".to_string(),
            data: json!({
                "overallRating": 4.2,
                "responseRate": 18.5,
                "issuesResolved": 95.3,
                "netPromoterScore": 42
            }),
        },
    ]
}
