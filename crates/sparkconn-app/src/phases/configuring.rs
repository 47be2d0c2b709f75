//! Configuring - the backend asked for connection parameters

use std::collections::BTreeMap;

use sparkconn_core::prelude::*;
use sparkconn_core::{BundleDescriptor, OpenRequest, SavedConfiguration, SparkOption};

use super::ActionSignal;

/// Connection form: backend limits and offers plus the user's selection
#[derive(Debug, Default)]
pub struct ConfiguringPhase {
    maxmemory: Option<String>,
    sparkversion: Option<String>,
    cluster: Option<String>,
    available_options: BTreeMap<String, Vec<String>>,
    available_bundles: BTreeMap<String, BundleDescriptor>,
    selection: SavedConfiguration,
    /// Fired when the user submits the form
    pub connect: ActionSignal<SavedConfiguration>,
}

impl ConfiguringPhase {
    /// Populate from an `open` request, seeding the selection from `saved`.
    ///
    /// Saved bundles the backend no longer offers for this cluster are dropped.
    pub fn init(&mut self, open: &OpenRequest, saved: SavedConfiguration) {
        self.maxmemory = open.maxmemory.clone();
        self.sparkversion = open.sparkversion.clone();
        self.cluster = open.cluster.clone();
        self.available_options = open.availableoptions.clone();
        self.available_bundles = open.availablebundles.clone();

        let SavedConfiguration {
            bundled_options,
            list_of_options,
        } = saved;
        let (kept, dropped): (Vec<_>, Vec<_>) = bundled_options
            .into_iter()
            .partition(|name| self.is_offered(name));
        if !dropped.is_empty() {
            debug!("Dropping saved bundles not offered by backend: {:?}", dropped);
        }

        self.selection = SavedConfiguration {
            bundled_options: kept,
            list_of_options,
        };
        self.connect.arm();
    }

    pub fn maxmemory(&self) -> Option<&str> {
        self.maxmemory.as_deref()
    }

    pub fn sparkversion(&self) -> Option<&str> {
        self.sparkversion.as_deref()
    }

    pub fn cluster(&self) -> Option<&str> {
        self.cluster.as_deref()
    }

    /// Option names offered by the backend, by category
    pub fn available_options(&self) -> &BTreeMap<String, Vec<String>> {
        &self.available_options
    }

    /// Bundles that apply to the backend's cluster
    pub fn offered_bundles(&self) -> impl Iterator<Item = (&str, &BundleDescriptor)> {
        let cluster = self.cluster.as_deref();
        self.available_bundles
            .iter()
            .filter(move |(_, bundle)| bundle.applies_to(cluster))
            .map(|(name, bundle)| (name.as_str(), bundle))
    }

    fn is_offered(&self, bundle: &str) -> bool {
        self.available_bundles
            .get(bundle)
            .is_some_and(|b| b.applies_to(self.cluster.as_deref()))
    }

    /// Current form contents
    pub fn selection(&self) -> &SavedConfiguration {
        &self.selection
    }

    /// Set an option, replacing any earlier value with the same name
    pub fn add_option(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let option = SparkOption::new(name, value);
        match self
            .selection
            .list_of_options
            .iter_mut()
            .find(|o| o.name == option.name)
        {
            Some(existing) => existing.value = option.value,
            None => self.selection.list_of_options.push(option),
        }
    }

    /// Returns `true` if an option was removed
    pub fn remove_option(&mut self, name: &str) -> bool {
        let before = self.selection.list_of_options.len();
        self.selection.list_of_options.retain(|o| o.name != name);
        self.selection.list_of_options.len() != before
    }

    /// Select or deselect a bundle.
    ///
    /// Returns the new selection state, or `None` if the bundle is not offered.
    pub fn toggle_bundle(&mut self, bundle: &str) -> Option<bool> {
        if !self.is_offered(bundle) {
            return None;
        }

        let selected = &mut self.selection.bundled_options;
        match selected.iter().position(|b| b == bundle) {
            Some(idx) => {
                selected.remove(idx);
                Some(false)
            }
            None => {
                selected.push(bundle.to_string());
                Some(true)
            }
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::from("Configure Spark connection");
        if let Some(cluster) = &self.cluster {
            out.push_str(&format!("\n  cluster: {}", cluster));
        }
        if let Some(version) = &self.sparkversion {
            out.push_str(&format!("\n  spark version: {}", version));
        }
        if let Some(mem) = &self.maxmemory {
            out.push_str(&format!("\n  max memory: {}", mem));
        }
        for (name, _) in self.offered_bundles() {
            let mark = if self.selection.bundled_options.iter().any(|b| b == name) {
                "x"
            } else {
                " "
            };
            out.push_str(&format!("\n  [{}] {}", mark, name));
        }
        for option in &self.selection.list_of_options {
            out.push_str(&format!("\n  {} = {}", option.name, option.value));
        }
        out
    }
}
