//! Contact query results and the detection contract the scene fulfils.

use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::geom::Point;
use crate::object::ObjectId;

/// A point landing inside an object's silhouette.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub object: ObjectId,
    /// From the object's logical position to the queried point, in the
    /// object's layer coordinates.
    pub vector: Point,
}

/// Contacts found in one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerContacts {
    pub layer: usize,
    pub contacts: Vec<Contact>,
}

/// Point-contact queries across layers. Only enabled layers take part.
/// An empty result means "nothing there", never an error.
pub trait ContactDetection {
    /// Contacts at a device point, back to front across all enabled layers.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::SingularTransform`] if a layer transform is not
    /// invertible.
    fn check_contact(&self, point: Point) -> Result<Vec<Contact>, SceneError>;

    /// Contacts in enabled layers strictly above `layer`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::InvalidLayer`] for an out-of-range index.
    fn check_contact_above_layer(&self, point: Point, layer: usize) -> Result<Vec<Contact>, SceneError>;

    /// Contacts in one layer, empty if that layer is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::InvalidLayer`] for an out-of-range index.
    fn check_contact_in_layer(&self, point: Point, layer: usize) -> Result<Vec<Contact>, SceneError>;

    /// Contacts grouped per layer, bottom layer first. Disabled layers report
    /// no contacts.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::SingularTransform`] if a layer transform is not
    /// invertible.
    fn check_layer_contacts(&self, point: Point) -> Result<Vec<LayerContacts>, SceneError>;

    /// Contacts of the top-most layer that has any.
    ///
    /// # Errors
    ///
    /// Same as [`ContactDetection::check_layer_contacts`].
    fn top_contacts(&self, point: Point) -> Result<Vec<Contact>, SceneError> {
        let layers = self.check_layer_contacts(point)?;
        Ok(layers
            .into_iter()
            .rev()
            .find(|group| !group.contacts.is_empty())
            .map(|group| group.contacts)
            .unwrap_or_default())
    }

    /// The front-most single contact at a point.
    ///
    /// # Errors
    ///
    /// Same as [`ContactDetection::check_layer_contacts`].
    fn top_contact(&self, point: Point) -> Result<Option<Contact>, SceneError> {
        Ok(self.top_contacts(point)?.pop())
    }

    /// `Some(point)` if nothing is under it.
    ///
    /// # Errors
    ///
    /// Same as [`ContactDetection::check_contact`].
    fn point_without_contact(&self, point: Point) -> Result<Option<Point>, SceneError> {
        Ok(self.check_contact(point)?.is_empty().then_some(point))
    }

    /// `Some(point)` if nothing in a layer above `layer` is under it.
    ///
    /// # Errors
    ///
    /// Same as [`ContactDetection::check_contact_above_layer`].
    fn point_without_contact_above_layer(&self, point: Point, layer: usize) -> Result<Option<Point>, SceneError> {
        Ok(self.check_contact_above_layer(point, layer)?.is_empty().then_some(point))
    }
}
