//! The seven TCFD table layouts and the zebra-striped renderer that draws them.
//!
//! Every table is a 4x6 grid: a two-group banner, a header row, then two
//! data rows whose three leftmost columns carry fixed labels and whose three
//! rightmost columns receive generated content.

use tcfd_core::{ContentRow, Result};
use tcfd_pptx::{init_grid, Align, Deck, FillSpec, Rgb, Slide, TextStyle};

use crate::fragment::{DirectRenderer, StandaloneRenderer};

const ROWS: usize = 4;
const COLS: usize = 6;
const DATA_ROWS: [usize; 2] = [2, 3];

const BANNER_STYLE: TextStyle = TextStyle::new(16).bold(true).color(Rgb::BLACK).align(Align::Center);
const HEADER_STYLE: TextStyle = TextStyle::new(10).bold(true).color(Rgb::TEXT).align(Align::Center);
const LABEL_STYLE: TextStyle = TextStyle::new(9).color(Rgb::TEXT).align(Align::Center);

const RISK_WIDTHS: [f64; COLS] = [0.9, 1.3, 0.9, 2.7, 2.7, 2.1];
const METRIC_WIDTHS: [f64; COLS] = [1.2, 1.2, 1.0, 2.5, 2.5, 2.0];
const CONTROL_WIDTHS: [f64; COLS] = [1.2, 1.5, 2.0, 2.8, 2.5, 2.0];

const RISK_HEADERS: [&str; COLS] = [
    "Type",
    "Climate\nChange\nRelated Factor",
    "Impact\nPeriod",
    "Description of Content",
    "Potential Financial Impact",
    "Adaption & Response",
];

const SHORT_MEDIUM: &str = "Short-term\nand\nmedium-term";

/// Static description of one table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableLayout {
    /// Left and right banner texts spanning columns 0-2 and 3-5.
    pub banners: [&'static str; 2],
    pub headers: [&'static str; COLS],
    /// Label cells of the two data rows; empty strings stay blank.
    pub labels: [[&'static str; 3]; 2],
    pub widths: [f64; COLS],
    /// Merge the type column across both data rows.
    pub merge_type_column: bool,
}

pub const TRANSFORMATION_RISKS: TableLayout = TableLayout {
    banners: ["Climate-Related Risks", "Financial Impacts"],
    headers: RISK_HEADERS,
    labels: [
        ["Transformation\nRisk", "Policy and\nRegulation", SHORT_MEDIUM],
        ["", "Green product\nand technology", SHORT_MEDIUM],
    ],
    widths: RISK_WIDTHS,
    merge_type_column: true,
};

pub const PHYSICAL_RISKS: TableLayout = TableLayout {
    banners: ["Climate-Related Risks", "Financial Impacts"],
    headers: RISK_HEADERS,
    labels: [
        ["Physical\nRisk", "Acute\n(Extreme Weather)", "Short-term"],
        ["", "Chronic\n(Rising Temperatures)", "Medium-term\nand\nlong-term"],
    ],
    widths: RISK_WIDTHS,
    merge_type_column: true,
};

pub const RESOURCE_OPPORTUNITIES: TableLayout = TableLayout {
    banners: ["Climate Opportunities", "Financial Benefits"],
    headers: RISK_HEADERS,
    labels: [
        ["Resource\nEfficiency", "Production process\nefficiency", SHORT_MEDIUM],
        ["Energy\nSource", "Use of lower-emission\nsources of energy", SHORT_MEDIUM],
    ],
    widths: RISK_WIDTHS,
    merge_type_column: false,
};

pub const PRODUCT_OPPORTUNITIES: TableLayout = TableLayout {
    banners: ["Climate Opportunities", "Financial Benefits"],
    headers: RISK_HEADERS,
    labels: [
        ["Products &\nServices", "Low-emission goods\nand services", "Medium-term"],
        ["Markets &\nResilience", "Access to new\nmarkets", "Medium-term\nand\nlong-term"],
    ],
    widths: RISK_WIDTHS,
    merge_type_column: false,
};

pub const METRICS_TARGETS: TableLayout = TableLayout {
    banners: ["Metrics & Targets", "Performance Indicators"],
    headers: [
        "Type",
        "Metric\nCategory",
        "Target\nTimeframe",
        "Current Progress\n& Status",
        "Financial\nLinkage",
        "Action Plan",
    ],
    labels: [
        ["GHG Emissions\n(Scope 1, 2, 3)", "Emission Reduction\nTargets", SHORT_MEDIUM],
        ["Climate-Related\nTargets", "Water, Waste &\nGreen Revenue", SHORT_MEDIUM],
    ],
    widths: METRIC_WIDTHS,
    merge_type_column: false,
};

pub const SYSTEMIC_CONTROL: TableLayout = TableLayout {
    banners: ["Systemic Risk Control", "Infrastructure & Assurance"],
    headers: [
        "Control Area",
        "External Driver /\nRequirement",
        "System Gap /\nExposure",
        "Mitigation Protocol\n(Soft Infrastructure)",
        "Liability Avoidance /\nCost Benefit",
        "Budget\nAllocation",
    ],
    labels: [
        ["Data Integrity\n(Scope 3)", "Mandatory 3rd-Party\nVerification", "Unverified Upstream\nData"],
        ["Supply Chain\nIntegrity", "Traceability &\nDue Diligence", "Tier-2 Visibility\nGap"],
    ],
    widths: CONTROL_WIDTHS,
    merge_type_column: false,
};

pub const OPERATIONAL_RESILIENCE: TableLayout = TableLayout {
    banners: ["Operational Resilience", "Adaptive Capacity (Human & Supply)"],
    headers: [
        "Resilience Unit",
        "Physical/Tech\nStressor",
        "Operational Impact\n(Downtime Risk)",
        "Adaptation Strategy\n(Capacity Building)",
        "Continuity Benefit\n(ROI)",
        "Budget\nAllocation",
    ],
    labels: [
        ["Workforce\nAdaptation", "Thermal Stress /\nNew Process Risks", "Productivity Loss\n(-15% Forecast)"],
        ["Value Chain\nSecurity", "Resource Competition\n(Water/Power)", "License to Operate\nRevocation"],
    ],
    widths: CONTROL_WIDTHS,
    merge_type_column: false,
};

/// Draws a [`TableLayout`] as a borderless zebra-striped grid.
///
/// The same table works in either integration mode; the registry decides
/// which one a topic uses.
#[derive(Debug, Clone, Copy)]
pub struct ZebraTable {
    layout: TableLayout,
}

impl ZebraTable {
    pub const fn new(layout: TableLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    /// Draw the table onto a slide.
    pub fn draw(&self, slide: &mut Slide, rows: &[ContentRow]) -> Result<()> {
        let layout = &self.layout;
        let grid = init_grid(slide, ROWS, COLS, &layout.widths)?;

        grid.fill_row(0, Rgb::WHITE)?;
        grid.fill_row(1, Rgb::HEADER)?;
        for (i, &row) in DATA_ROWS.iter().enumerate() {
            grid.fill_row(row, if i % 2 == 0 { Rgb::WHITE } else { Rgb::STRIPE })?;
        }

        grid.set_cell(0, 0, layout.banners[0], BANNER_STYLE)?;
        grid.set_cell(0, 3, layout.banners[1], BANNER_STYLE)?;
        grid.merge_cells(0, 0, 0, 2)?;
        grid.merge_cells(0, 3, 0, 5)?;

        for (col, header) in layout.headers.iter().enumerate() {
            grid.set_cell(1, col, header, HEADER_STYLE)?;
        }

        for (labels, &row) in layout.labels.iter().zip(DATA_ROWS.iter()) {
            for (col, label) in labels.iter().enumerate() {
                if label.is_empty() {
                    continue;
                }
                grid.set_cell(row, col, label, LABEL_STYLE.bold(col == 0))?;
            }
        }
        if layout.merge_type_column {
            grid.merge_cells(DATA_ROWS[0], 0, DATA_ROWS[1], 0)?;
        }

        grid.fill_rows_with_rows(&DATA_ROWS, rows, &FillSpec::default())?;
        Ok(())
    }
}

impl DirectRenderer for ZebraTable {
    fn render_into(&self, rows: &[ContentRow], deck: &mut Deck) -> Result<()> {
        self.draw(deck.add_slide(), rows)
    }
}

impl StandaloneRenderer for ZebraTable {
    fn render_standalone(&self, rows: &[ContentRow]) -> Result<Deck> {
        let mut deck = Deck::new();
        self.draw(deck.add_slide(), rows)?;
        Ok(deck)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcfd_pptx::{Anchor, Merge, Shape};

    fn rows() -> Vec<ContentRow> {
        vec![
            ContentRow::new("Carbon tax;New levy on scope 1", "$1M", "Offsets; $200K"),
            ContentRow::new("Green tech shift", "$2M", "R&D"),
        ]
    }

    fn drawn(layout: TableLayout, rows: &[ContentRow]) -> tcfd_pptx::Grid {
        let deck = ZebraTable::new(layout).render_standalone(rows).unwrap();
        assert_eq!(deck.slide_count(), 1);
        match &deck.slides()[0].shapes()[0] {
            Shape::Table(grid) => grid.clone(),
        }
    }

    #[test]
    fn test_banner_and_header_rows() {
        let grid = drawn(TRANSFORMATION_RISKS, &rows());
        assert_eq!(grid.cell(0, 0).unwrap().text(), "Climate-Related Risks");
        assert_eq!(
            grid.cell(0, 0).unwrap().merge(),
            Merge::Origin {
                row_span: 1,
                col_span: 3
            }
        );
        assert_eq!(grid.cell(0, 3).unwrap().text(), "Financial Impacts");
        assert_eq!(grid.cell(0, 3).unwrap().style().size, 16);
        assert_eq!(grid.cell(1, 0).unwrap().fill(), Some(Rgb::HEADER));
        assert!(grid.cell(1, 5).unwrap().style().bold);
    }

    #[test]
    fn test_zebra_stripes_and_labels() {
        let grid = drawn(TRANSFORMATION_RISKS, &rows());
        assert_eq!(grid.cell(2, 4).unwrap().fill(), Some(Rgb::WHITE));
        assert_eq!(grid.cell(3, 4).unwrap().fill(), Some(Rgb::STRIPE));
        assert!(grid.cell(2, 0).unwrap().style().bold);
        assert!(!grid.cell(2, 1).unwrap().style().bold);
        assert_eq!(
            grid.cell(3, 0).unwrap().merge(),
            Merge::Covered {
                horizontal: false,
                vertical: true
            }
        );
    }

    #[test]
    fn test_generated_columns() {
        let grid = drawn(TRANSFORMATION_RISKS, &rows());
        assert_eq!(grid.cell(2, 3).unwrap().text(), "New levy on scope 1");
        assert_eq!(grid.cell(2, 4).unwrap().text(), "$1M");
        assert_eq!(grid.cell(2, 5).unwrap().text(), "Offsets; $200K");
        assert_eq!(grid.cell(3, 3).unwrap().text(), "Green tech shift");
        assert_eq!(grid.cell(3, 3).unwrap().anchor(), Anchor::Top);
    }

    #[test]
    fn test_missing_rows_leave_blank_cells() {
        let grid = drawn(SYSTEMIC_CONTROL, &rows()[..1]);
        assert_eq!(grid.cell(3, 3).unwrap().text(), "");
        assert_eq!(grid.cell(3, 0).unwrap().text(), "Supply Chain\nIntegrity");
    }

    #[test]
    fn test_direct_mode_appends_one_slide() {
        let mut deck = Deck::new();
        deck.add_slide();
        ZebraTable::new(METRICS_TARGETS)
            .render_into(&rows(), &mut deck)
            .unwrap();
        assert_eq!(deck.slide_count(), 2);
        assert_eq!(deck.slides()[1].tables().count(), 1);
    }

    #[test]
    fn test_every_layout_draws() {
        for layout in [
            TRANSFORMATION_RISKS,
            PHYSICAL_RISKS,
            RESOURCE_OPPORTUNITIES,
            PRODUCT_OPPORTUNITIES,
            METRICS_TARGETS,
            SYSTEMIC_CONTROL,
            OPERATIONAL_RESILIENCE,
        ] {
            let grid = drawn(layout, &rows());
            assert_eq!(grid.rows(), 4);
            assert_eq!(grid.cols(), 6);
        }
    }
}
