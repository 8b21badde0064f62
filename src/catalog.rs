use crate::domain::ColumnKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub code: &'static str,
    pub csv_id: &'static str,
}

pub const REGIONS: [Region; 14] = [
    Region { code: "PHA", csv_id: "00" },
    Region { code: "STC", csv_id: "01" },
    Region { code: "JHC", csv_id: "02" },
    Region { code: "PLK", csv_id: "03" },
    Region { code: "ULK", csv_id: "04" },
    Region { code: "HKK", csv_id: "05" },
    Region { code: "JHM", csv_id: "06" },
    Region { code: "MSK", csv_id: "07" },
    Region { code: "OLK", csv_id: "14" },
    Region { code: "ZLK", csv_id: "15" },
    Region { code: "VYS", csv_id: "16" },
    Region { code: "PAK", csv_id: "17" },
    Region { code: "LBK", csv_id: "18" },
    Region { code: "KVK", csv_id: "19" },
];

pub const RAW_HEADERS: [&str; 64] = [
    "p1", "p36", "p37", "p2a", "weekdayp2a", "p2b", "p6", "p7", "p8", "p9", "p10", "p11", "p12",
    "p13a", "p13b", "p13c", "p14", "p15", "p16", "p17", "p18", "p19", "p20", "p21", "p22", "p23",
    "p24", "p27", "p28", "p34", "p35", "p39", "p44", "p45a", "p47", "p48a", "p49", "p50a", "p50b",
    "p51", "p52", "p53", "p55a", "p57", "p58", "a", "b", "d", "e", "f", "g", "h", "i", "j", "k",
    "l", "n", "o", "p", "q", "r", "s", "t", "p5a",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub source_index: usize,
    pub kind: ColumnKind,
}

const fn int8(name: &'static str, source_index: usize) -> ColumnSpec {
    ColumnSpec {
        name,
        source_index,
        kind: ColumnKind::Int8,
    }
}

const fn text(name: &'static str, source_index: usize, width: usize) -> ColumnSpec {
    ColumnSpec {
        name,
        source_index,
        kind: ColumnKind::Text { width },
    }
}

pub const RETAINED_COLUMNS: [ColumnSpec; 48] = [
    text("p1", 0, 14),
    int8("p36", 1),
    int8("p37", 2),
    text("p2a", 3, 12),
    int8("weekdayp2a", 4),
    text("p2b", 5, 6),
    int8("p6", 6),
    int8("p7", 7),
    int8("p8", 8),
    int8("p9", 9),
    int8("p10", 10),
    int8("p11", 11),
    ColumnSpec {
        name: "p12",
        source_index: 12,
        kind: ColumnKind::Int16,
    },
    int8("p13a", 13),
    int8("p13b", 14),
    int8("p13c", 15),
    int8("p14", 16),
    int8("p15", 17),
    int8("p16", 18),
    int8("p17", 19),
    int8("p18", 20),
    int8("p19", 21),
    int8("p20", 22),
    int8("p21", 23),
    int8("p22", 24),
    int8("p23", 25),
    int8("p24", 26),
    int8("p27", 27),
    int8("p28", 28),
    int8("p34", 29),
    int8("p35", 30),
    int8("p39", 31),
    int8("p44", 32),
    int8("p45a", 33),
    int8("p47", 34),
    int8("p48a", 35),
    int8("p49", 36),
    int8("p50a", 37),
    int8("p50b", 38),
    int8("p51", 39),
    int8("p52", 40),
    int8("p53", 41),
    int8("p55a", 42),
    int8("p57", 43),
    int8("p58", 44),
    ColumnSpec {
        name: "d",
        source_index: 47,
        kind: ColumnKind::Float64,
    },
    ColumnSpec {
        name: "e",
        source_index: 48,
        kind: ColumnKind::Float64,
    },
    int8("p5a", 63),
];

pub const REGION_COLUMN: &str = "region";

pub fn region_by_code(code: &str) -> Option<usize> {
    REGIONS
        .iter()
        .position(|region| region.code.eq_ignore_ascii_case(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retained_columns_follow_raw_headers() {
        for spec in RETAINED_COLUMNS {
            assert_eq!(RAW_HEADERS[spec.source_index], spec.name);
        }
    }

    #[test]
    fn retained_positions_are_increasing() {
        let positions = RETAINED_COLUMNS
            .iter()
            .map(|spec| spec.source_index)
            .collect::<Vec<_>>();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(positions.last(), Some(&63));
    }

    #[test]
    fn region_lookup_ignores_case() {
        assert_eq!(region_by_code("jhm"), Some(6));
        assert_eq!(region_by_code("XXX"), None);
    }
}
