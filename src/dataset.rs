/// Elia open-data datasets used by the balancing dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    /// Imbalance prices, system imbalance and alpha.
    ImbalancePrices,
    /// Activated balancing volumes (IGCC, aFRR, mFRR, reserve sharing).
    ActivatedVolumes,
    /// Available aFRR capacity.
    AvailableAfrr,
    /// Imbalance price cap and floor.
    CapFloorPrices,
    /// Available cross-border transfer capacity at the last closed gate.
    CrossBorderCapacity,
}

impl Dataset {
    pub const ALL: [Dataset; 5] = [
        Dataset::ImbalancePrices,
        Dataset::ActivatedVolumes,
        Dataset::AvailableAfrr,
        Dataset::CapFloorPrices,
        Dataset::CrossBorderCapacity,
    ];

    /// Returns the catalog code of the dataset on opendata.elia.be.
    pub const fn default_id(&self) -> &'static str {
        match self {
            Dataset::ImbalancePrices => "ods134",
            Dataset::ActivatedVolumes => "ods127",
            Dataset::AvailableAfrr => "ods152",
            Dataset::CapFloorPrices => "ods166",
            Dataset::CrossBorderCapacity => "ods061",
        }
    }

    /// Columns every record of the dataset must carry before it can be charted.
    pub const fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Dataset::ImbalancePrices => &["datetime", "imbalanceprice", "systemimbalance", "alpha"],
            Dataset::ActivatedVolumes => &[
                "datetime",
                "igccvolumeup",
                "igccvolumedown",
                "afrrvolumeup",
                "afrrvolumedown",
                "mfrrsaup",
                "mfrrsadown",
                "mfrrdaup",
                "mfrrdadown",
                "reserve_sharing_import",
                "reserve_sharing_export",
            ],
            Dataset::AvailableAfrr => &[
                "datetime",
                "downwardavailableafrrvol",
                "upwardavailableafrrvol",
            ],
            Dataset::CapFloorPrices => &["datetime", "cap", "floorprice"],
            Dataset::CrossBorderCapacity => &[
                "country",
                "availabletransfercapacityatlastclosedgate",
                "direction",
                "datetime",
                "resolutioncode",
            ],
        }
    }

    pub const fn title(&self) -> &'static str {
        match self {
            Dataset::ImbalancePrices => "Imbalance prices",
            Dataset::ActivatedVolumes => "Activated balancing volumes",
            Dataset::AvailableAfrr => "Available aFRR",
            Dataset::CapFloorPrices => "Cap and floor prices",
            Dataset::CrossBorderCapacity => "Cross-border capacity",
        }
    }
}

/// Maps each dataset to the catalog code it is fetched with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    cross_border_id: String,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            cross_border_id: Dataset::CrossBorderCapacity.default_id().to_owned(),
        }
    }
}

impl Catalog {
    pub fn with_cross_border_id(cross_border_id: impl Into<String>) -> Self {
        Self {
            cross_border_id: cross_border_id.into(),
        }
    }

    pub fn id(&self, dataset: Dataset) -> &str {
        match dataset {
            Dataset::CrossBorderCapacity => &self.cross_border_id,
            other => other.default_id(),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (Dataset, &str)> + '_ {
        Dataset::ALL.into_iter().map(move |dataset| (dataset, self.id(dataset)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_dataset_requires_datetime() {
        for dataset in Dataset::ALL {
            assert!(dataset.required_columns().contains(&"datetime"));
        }
    }

    #[test]
    fn test_catalog_override() {
        let catalog = Catalog::with_cross_border_id("ods999");

        assert_eq!(catalog.id(Dataset::CrossBorderCapacity), "ods999");
        assert_eq!(catalog.id(Dataset::ImbalancePrices), "ods134");
        assert_eq!(catalog.entries().count(), 5);
    }
}
